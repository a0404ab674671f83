// Application layer: adapters to the outside services the core calls out to.

pub mod generation;
