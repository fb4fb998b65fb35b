//! Controller orchestration for a tracked kind cluster.
//!
//! Ties the reconciler to the on-disk state: loads what was last applied,
//! compares it with the live backend and the desired model, runs the planned
//! lifecycle operation and records the result.

use crate::error::ControllerError;
use crate::plan::{PlanAction, plan};
use crate::reconciler::Reconciler;
use crate::state::{StateStore, TrackedState};
use kind_model::{ClusterModel, ReconciledState};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Main controller for one tracked cluster
pub struct Controller {
    reconciler: Reconciler,
    store: StateStore,
}

impl Controller {
    pub fn new(reconciler: Reconciler, store: StateStore) -> Self {
        Self { reconciler, store }
    }

    /// Action an apply of `desired` would take
    pub async fn plan(&self, desired: &ClusterModel) -> Result<PlanAction, ControllerError> {
        validate(desired)?;
        let tracked = self.store.load()?;
        self.plan_against(tracked.as_ref(), desired).await
    }

    /// Converge the backend on `desired` and record the result.
    ///
    /// A cluster whose nodes never became ready is still recorded, so the
    /// next apply refreshes or replaces it instead of creating a duplicate.
    pub async fn apply(
        &self,
        desired: ClusterModel,
        cancel: &CancellationToken,
    ) -> Result<TrackedState, ControllerError> {
        validate(&desired)?;
        let tracked = self.store.load()?;
        let action = self.plan_against(tracked.as_ref(), &desired).await?;
        info!("Applying kind cluster {}: {}", desired.name, action);

        let reconciled = match action {
            PlanAction::Refresh => self.reconciler.update(&desired).await?,
            PlanAction::Replace => {
                if let Some(prior) = &tracked {
                    self.reconciler.delete(&prior.model.name).await?;
                }
                self.store.clear()?;
                self.create(&desired, cancel).await?
            }
            PlanAction::Create => {
                if let Some(prior) = &tracked {
                    warn!("Tracked kind cluster {} no longer exists", prior.model.name);
                    self.store.clear()?;
                }
                self.create(&desired, cancel).await?
            }
        };

        let state = TrackedState::new(desired, reconciled);
        self.store.save(&state)?;
        Ok(state)
    }

    /// Re-read the tracked cluster. A vanished cluster stops being tracked.
    pub async fn refresh(&self) -> Result<Option<TrackedState>, ControllerError> {
        let Some(tracked) = self.store.load()? else {
            return Ok(None);
        };

        match self.reconciler.read(&tracked.model.name).await? {
            Some(reconciled) => {
                let state = TrackedState::new(tracked.model, reconciled);
                self.store.save(&state)?;
                Ok(Some(state))
            }
            None => {
                warn!("Kind cluster {} is gone, no longer tracking it", tracked.model.name);
                self.store.clear()?;
                Ok(None)
            }
        }
    }

    /// Delete the tracked cluster and stop tracking it.
    ///
    /// Returns the name of the destroyed cluster, `None` if nothing was tracked.
    pub async fn destroy(&self) -> Result<Option<String>, ControllerError> {
        let Some(tracked) = self.store.load()? else {
            return Ok(None);
        };

        self.reconciler.delete(&tracked.model.name).await?;
        self.store.clear()?;
        Ok(Some(tracked.model.name))
    }

    /// Start tracking an existing cluster.
    ///
    /// The configuration it was created from is unknown, so it is tracked
    /// with a default model carrying only its name.
    pub async fn import(&self, name: &str) -> Result<TrackedState, ControllerError> {
        if let Some(tracked) = self.store.load()? {
            if tracked.model.name != name {
                return Err(ControllerError::InvalidConfig(format!(
                    "kind cluster {} is already tracked in {}",
                    tracked.model.name,
                    self.store.path().display()
                )));
            }
        }

        let reconciled = self.reconciler.import(name).await?;
        let state = TrackedState::new(ClusterModel::named(name), reconciled);
        self.store.save(&state)?;
        Ok(state)
    }

    /// Every cluster the backend knows
    pub async fn list(&self) -> Result<Vec<String>, ControllerError> {
        self.reconciler.list().await
    }

    /// Kubeconfig recorded for the tracked cluster
    pub fn kubeconfig(&self) -> Result<String, ControllerError> {
        self.store
            .load()?
            .map(|tracked| tracked.reconciled.kubeconfig)
            .ok_or_else(|| {
                ControllerError::State(format!(
                    "no kind cluster is tracked in {}",
                    self.store.path().display()
                ))
            })
    }

    async fn plan_against(
        &self,
        tracked: Option<&TrackedState>,
        desired: &ClusterModel,
    ) -> Result<PlanAction, ControllerError> {
        let exists = match tracked {
            Some(tracked) => self.reconciler.read(&tracked.model.name).await?.is_some(),
            None => false,
        };
        Ok(plan(tracked.map(|t| &t.model), desired, exists))
    }

    async fn create(
        &self,
        desired: &ClusterModel,
        cancel: &CancellationToken,
    ) -> Result<ReconciledState, ControllerError> {
        match self.reconciler.create(desired, cancel).await {
            Err(ControllerError::WaitForNodes {
                name,
                state,
                source,
            }) => {
                warn!("Tracking kind cluster {} although its nodes are not ready", name);
                self.store
                    .save(&TrackedState::new(desired.clone(), (*state).clone()))?;
                Err(ControllerError::WaitForNodes {
                    name,
                    state,
                    source,
                })
            }
            result => result,
        }
    }
}

fn validate(model: &ClusterModel) -> Result<(), ControllerError> {
    if model.name.trim().is_empty() {
        return Err(ControllerError::InvalidConfig("cluster name must not be empty".to_string()));
    }
    Ok(())
}
