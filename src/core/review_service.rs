use crate::core::review_state::{self, ReviewAction, ReviewTransition};
use crate::core::scheduler;
use crate::domain::model::{Card, GeneratedCandidate, Grade, ReviewStatus, ScheduleState};
use crate::domain::ports::CardRepository;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Runs scheduler and state-machine decisions against a card repository.
/// Each call performs exactly one versioned write.
pub struct ReviewService<R: CardRepository> {
    repository: R,
}

impl<R: CardRepository> ReviewService<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub async fn add_card(&self, card: Card) -> Result<Card> {
        self.repository.insert_card(card.clone()).await?;
        tracing::debug!("Stored card {} for {}", card.id, card.owner_id);
        Ok(card)
    }

    /// Stores accepted candidates as `New` AI cards. One invalid candidate
    /// rejects the whole batch.
    pub async fn accept_candidates(
        &self,
        owner_id: Uuid,
        candidates: Vec<GeneratedCandidate>,
    ) -> Result<Vec<Card>> {
        let cards = candidates
            .into_iter()
            .map(|candidate| Card::from_candidate(owner_id, candidate))
            .collect::<Result<Vec<_>>>()?;
        self.repository.insert_cards(cards.clone()).await?;
        tracing::info!("Accepted {} generated cards for {}", cards.len(), owner_id);
        Ok(cards)
    }

    pub async fn grade_card(
        &self,
        owner_id: Uuid,
        card_id: Uuid,
        grade: u8,
        now: DateTime<Utc>,
    ) -> Result<ScheduleState> {
        let grade = Grade::new(grade)?;
        let snapshot = self.repository.load_card(owner_id, card_id).await?;
        let next = scheduler::grade(&snapshot.card.schedule, grade, now);

        self.repository
            .store_schedule(owner_id, card_id, snapshot.version, &next)
            .await?;

        tracing::info!(
            card_id = %card_id,
            grade = grade.value(),
            interval_days = next.interval_days,
            repetitions = next.repetitions,
            "Card reviewed"
        );
        Ok(next)
    }

    pub async fn apply_action(
        &self,
        owner_id: Uuid,
        card_id: Uuid,
        action: ReviewAction,
        now: DateTime<Utc>,
    ) -> Result<ReviewTransition> {
        let snapshot = self.repository.load_card(owner_id, card_id).await?;
        let transition =
            review_state::apply(&snapshot.card.review, &snapshot.card.content, action, now)?;

        self.repository
            .store_review_state(
                owner_id,
                card_id,
                snapshot.version,
                &transition.state,
                transition.content.as_ref(),
            )
            .await?;

        tracing::info!(card_id = %card_id, event = ?transition.event, "Review status updated");
        Ok(transition)
    }

    /// Approved, active cards that are due, most overdue first; never-reviewed
    /// cards come before everything else.
    pub async fn due_cards(&self, owner_id: Uuid, now: DateTime<Utc>) -> Result<Vec<Card>> {
        let mut due: Vec<Card> = self
            .repository
            .list_cards(owner_id)
            .await?
            .into_iter()
            .map(|snapshot| snapshot.card)
            .filter(|card| {
                card.review.status == ReviewStatus::Approved
                    && !card.review.is_archived()
                    && scheduler::is_due(&card.schedule, now)
            })
            .collect();
        due.sort_by_key(|card| (card.schedule.due_at, card.created_at));
        Ok(due)
    }
}
