use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crate::core::{LockConfig, Result, StoreError, Ticket, VersionClock};
use crate::store::{Column, ColumnStore, RowKey};

use super::{LockCandidate, LockId, LockOutcome};

/// Hands out proposer handles for named locks
pub struct LockManager {
    store: Arc<dyn ColumnStore>,
    clock: Arc<VersionClock>,
    config: LockConfig,
}

impl LockManager {
    pub fn new(store: Arc<dyn ColumnStore>, clock: Arc<VersionClock>, config: LockConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// A fresh proposer handle for one lock domain
    pub fn lock(&self, id: LockId) -> TicketLock {
        TicketLock {
            row: id.row_key(),
            id,
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            config: self.config.clone(),
            ticket: None,
        }
    }
}

/// One proposer's handle on one lock domain
///
/// Each acquisition attempt draws a fresh ticket; a failed attempt never
/// reuses its ticket. The handle owns at most one live proposal column at a
/// time.
pub struct TicketLock {
    id: LockId,
    row: RowKey,
    store: Arc<dyn ColumnStore>,
    clock: Arc<VersionClock>,
    config: LockConfig,
    ticket: Option<Ticket>,
}

impl TicketLock {
    pub fn id(&self) -> &LockId {
        &self.id
    }

    /// The ticket of the held lock, if any
    pub fn ticket(&self) -> Option<Ticket> {
        self.ticket
    }

    pub fn is_held(&self) -> bool {
        self.ticket.is_some()
    }

    /// Attempt to acquire the lock
    ///
    /// Registers a TTL-bounded proposal, then reads the two lowest live
    /// tickets and applies the decision rule. Losing the race is a normal
    /// `false`; only store failures are errors. When the outcome cannot be
    /// decided yet, because a second proposal exists that has not yet
    /// acknowledged this one, the attempt polls up to the configured bound,
    /// then cleans up its own proposal and gives up. The TTL also self-heals
    /// a holder that crashes without unlocking: the store expires its column.
    pub async fn try_lock(&mut self, ttl: Duration) -> Result<bool> {
        let ticket = self.clock.next();
        let proposal = Column::new(ticket.as_bytes().to_vec(), Vec::new()).with_ttl(ttl);
        self.store
            .write_column(&self.row, proposal, self.config.consistency)
            .await?;

        let mut polls = 0u32;
        loop {
            let columns = self
                .store
                .read_top_columns(&self.row, 2, self.config.consistency)
                .await?;
            let Some(candidate) = LockCandidate::from_columns(&columns)? else {
                // Our own proposal already expired; nothing left to clean up
                debug!("proposal {} for {} expired mid-attempt", ticket, self.id);
                return Ok(false);
            };

            match candidate.judge(ticket) {
                LockOutcome::Acquired => {
                    debug!("{} acquired by ticket {}", self.id, ticket);
                    self.ticket = Some(ticket);
                    return Ok(true);
                }
                LockOutcome::Lost => {
                    // Second place owes the leader an acknowledgement before
                    // walking away; the column stays behind for TTL expiry so
                    // the ack remains observable.
                    if candidate.second == Some(ticket) && candidate.second_acked.is_none() {
                        self.ack_proposed(ticket, candidate.first, ttl).await?;
                    }
                    debug!("{} lost to ticket {}", self.id, candidate.first);
                    return Ok(false);
                }
                LockOutcome::Undecided => {
                    if polls >= self.config.max_polls {
                        self.store
                            .delete_column(&self.row, ticket.as_bytes(), self.config.consistency)
                            .await?;
                        debug!("{} gave up after {} polls", self.id, polls);
                        return Ok(false);
                    }
                    polls += 1;
                    sleep(self.config.poll_interval).await;
                }
            }
        }
    }

    /// Release the held lock
    pub async fn unlock(&mut self) -> Result<()> {
        let Some(ticket) = self.ticket.take() else {
            return Err(StoreError::Lock(format!(
                "unlock called on {} with no lock held",
                self.id
            )));
        };
        self.store
            .delete_column(&self.row, ticket.as_bytes(), self.config.consistency)
            .await?;
        debug!("{} released by ticket {}", self.id, ticket);
        Ok(())
    }

    /// Write the leader's ticket into our own column: the only way a
    /// second-place proposer can tell the leader "I have seen you" through
    /// the row alone. Rewriting the column re-arms its TTL.
    async fn ack_proposed(&self, own: Ticket, first: Ticket, ttl: Duration) -> Result<()> {
        let column = Column::new(own.as_bytes().to_vec(), first.as_bytes().to_vec()).with_ttl(ttl);
        self.store
            .write_column(&self.row, column, self.config.consistency)
            .await
    }
}
