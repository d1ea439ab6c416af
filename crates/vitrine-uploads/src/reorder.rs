//! Reorder coordinator
//!
//! Holds the working order of a list of sibling entities while the user
//! drags them around. Moves are local only; `commit` sends the complete
//! `{id, position}` set in one request and closes the surface. A new surface
//! is opened by seeding a new coordinator from fresh server data.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;
use vitrine_core::{EntityType, PositionUpdate, ReorderApi};

use crate::error::PipelineError;

/// An entity that has an id and a server-known position
pub trait Orderable {
    fn id(&self) -> Uuid;
    fn position(&self) -> u32;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderableItem<T> {
    pub item: T,
    pub id: Uuid,
    /// Position the server reported when the surface opened
    pub current_position: u32,
    /// Index in the seeded order
    pub seeded_index: usize,
    /// 1-based, contiguous across the list
    pub working_position: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceState {
    Open,
    Saving,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Nothing moved; the surface closed without a request.
    NoChanges,
    Saved { updated: usize },
}

struct Surface<T> {
    items: Vec<OrderableItem<T>>,
    state: SurfaceState,
}

impl<T> Surface<T> {
    fn renumber(&mut self) {
        for (index, item) in self.items.iter_mut().enumerate() {
            item.working_position = index as u32 + 1;
        }
    }

    fn has_changes(&self) -> bool {
        self.items
            .iter()
            .any(|item| item.working_position as usize != item.seeded_index + 1)
    }

    fn position_updates(&self) -> Vec<PositionUpdate> {
        self.items
            .iter()
            .map(|item| PositionUpdate::new(item.id, item.working_position))
            .collect()
    }

    fn ensure_open(&self) -> Result<(), PipelineError> {
        match self.state {
            SurfaceState::Open => Ok(()),
            SurfaceState::Saving => Err(PipelineError::SurfaceBusy),
            SurfaceState::Closed => Err(PipelineError::SurfaceClosed),
        }
    }

    fn close(&mut self) {
        self.state = SurfaceState::Closed;
        self.items.clear();
    }
}

pub struct ReorderCoordinator<T> {
    api: Arc<dyn ReorderApi>,
    entity_type: EntityType,
    surface: Mutex<Surface<T>>,
}

impl<T: Orderable + Clone + Send> ReorderCoordinator<T> {
    /// Open a surface over `items`, ordered by their server position.
    /// Ties keep their input order.
    pub fn seed(api: Arc<dyn ReorderApi>, entity_type: EntityType, items: Vec<T>) -> Self {
        let mut items = items;
        items.sort_by_key(|item| item.position());
        let items: Vec<OrderableItem<T>> = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| OrderableItem {
                id: item.id(),
                current_position: item.position(),
                seeded_index: index,
                working_position: index as u32 + 1,
                item,
            })
            .collect();

        tracing::debug!(entity_type = %entity_type, count = items.len(), "Reorder surface seeded");

        Self {
            api,
            entity_type,
            surface: Mutex::new(Surface {
                items,
                state: SurfaceState::Open,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Surface<T>> {
        self.surface.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn state(&self) -> SurfaceState {
        self.lock().state
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Remove the item at `from` and reinsert it at `to` (0-based).
    pub fn move_item(&self, from: usize, to: usize) -> Result<(), PipelineError> {
        let surface = &mut *self.lock();
        surface.ensure_open()?;
        let len = surface.items.len();
        if from >= len || to >= len {
            return Err(PipelineError::InvalidMove { from, to, len });
        }
        if from == to {
            return Ok(());
        }
        let item = surface.items.remove(from);
        surface.items.insert(to, item);
        surface.renumber();
        Ok(())
    }

    pub fn move_up(&self, index: usize) -> Result<(), PipelineError> {
        let to = index.checked_sub(1).ok_or(PipelineError::InvalidMove {
            from: index,
            to: 0,
            len: self.len(),
        })?;
        self.move_item(index, to)
    }

    pub fn move_down(&self, index: usize) -> Result<(), PipelineError> {
        let to = index.checked_add(1).ok_or(PipelineError::InvalidMove {
            from: index,
            to: index,
            len: self.len(),
        })?;
        self.move_item(index, to)
    }

    /// Whether any item left its seeded slot.
    pub fn has_changes(&self) -> bool {
        self.lock().has_changes()
    }

    pub fn position_updates(&self) -> Vec<PositionUpdate> {
        self.lock().position_updates()
    }

    /// Items in working order
    pub fn items(&self) -> Vec<OrderableItem<T>> {
        self.lock().items.clone()
    }

    pub fn ordered(&self) -> Vec<T> {
        self.lock().items.iter().map(|i| i.item.clone()).collect()
    }

    /// Persist the working order.
    ///
    /// Without changes the surface just closes. On failure the working order
    /// is kept and the surface reopens so the user can retry.
    pub async fn commit(&self) -> Result<CommitOutcome, PipelineError> {
        let updates = {
            let surface = &mut *self.lock();
            surface.ensure_open()?;
            if !surface.has_changes() {
                surface.close();
                tracing::debug!(entity_type = %self.entity_type, "No changes, closing reorder surface");
                return Ok(CommitOutcome::NoChanges);
            }
            surface.state = SurfaceState::Saving;
            surface.position_updates()
        };

        let count = updates.len();
        let mut guard = SavingGuard {
            surface: &self.surface,
            armed: true,
        };
        tracing::info!(entity_type = %self.entity_type, count, "Saving new order");
        let result = self.api.reorder(self.entity_type, updates).await;
        guard.armed = false;

        let surface = &mut *self.lock();
        match result {
            Ok(()) => {
                surface.close();
                Ok(CommitOutcome::Saved { updated: count })
            }
            Err(err) => {
                tracing::warn!(entity_type = %self.entity_type, error = %err, "Saving order failed");
                surface.state = SurfaceState::Open;
                Err(PipelineError::Reorder(err))
            }
        }
    }

    /// Close without saving.
    pub fn cancel(&self) -> Result<(), PipelineError> {
        let surface = &mut *self.lock();
        if surface.state == SurfaceState::Saving {
            return Err(PipelineError::SurfaceBusy);
        }
        surface.close();
        Ok(())
    }
}

/// Reopens the surface if a commit future is dropped mid-request.
struct SavingGuard<'a, T> {
    surface: &'a Mutex<Surface<T>>,
    armed: bool,
}

impl<T> Drop for SavingGuard<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let surface = &mut *self.surface.lock().unwrap_or_else(PoisonError::into_inner);
        if surface.state == SurfaceState::Saving {
            surface.state = SurfaceState::Open;
        }
    }
}
