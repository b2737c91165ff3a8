//! # Chain Resolver
//!
//! Drives a [`Chain`] against a [`LookupService`]. The chain sits behind a mutex that is
//! only held while planning or applying a lookup, never across the lookup itself, so
//! several selections may be in flight at once. Their ordering is settled by the chain's
//! per-node tokens: whichever ticket was issued last is the only one allowed to land.

use crate::{
    core::chain::{Chain, ChainAction, ChainError, RefreshOutcome, RefreshTicket},
    system::lookup::LookupService,
};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinSet;

/// What a selection (or explicit refresh) ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// A lookup ran for the successor; see the inner outcome for whether it landed.
    Lookup(RefreshOutcome),
    /// The selected node is the last one of the chain.
    Terminal,
    /// The successor could not be looked up because these nodes are still unset.
    Blocked {
        /// The node left without options.
        node: String,
        /// Unset upstream nodes, in index order.
        missing: Vec<String>,
    },
    /// A root was selected; nothing depends on it.
    Independent,
}

/// Shared handle on a chain and the service that fills it. Clones drive the same chain.
#[derive(Debug)]
pub struct ChainResolver<S> {
    chain: Arc<Mutex<Chain>>,
    service: Arc<S>,
}

impl<S> Clone for ChainResolver<S> {
    fn clone(&self) -> Self {
        Self {
            chain: Arc::clone(&self.chain),
            service: Arc::clone(&self.service),
        }
    }
}

impl<S: LookupService + 'static> ChainResolver<S> {
    /// Takes ownership of both the chain and the service.
    pub fn new(chain: Chain, service: S) -> Self {
        Self::with_shared_service(chain, Arc::new(service))
    }

    /// Like [`ChainResolver::new`], for a service that is also used elsewhere.
    pub fn with_shared_service(chain: Chain, service: Arc<S>) -> Self {
        Self {
            chain: Arc::new(Mutex::new(chain)),
            service,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Chain> {
        // Every chain mutation completes before the guard drops; poisoning cannot tear it.
        self.chain.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Loads every root and the first dependent concurrently, without filters.
    /// Outcomes are returned in chain order.
    pub async fn initialize(&self) -> Result<Vec<RefreshOutcome>, ChainError> {
        let targets = self.lock().initial_targets();
        log::debug!("Initializing chain; eager targets: {:?}", targets);

        let mut tasks = JoinSet::new();
        for name in &targets {
            let action = self.lock().request_options(name)?;
            if let ChainAction::Refresh(ticket) = action {
                let this = self.clone();
                tasks.spawn(async move { this.run(ticket).await });
            }
        }

        let mut outcomes = Vec::with_capacity(targets.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => log::error!("Initial lookup task did not complete: {}", e),
            }
        }
        outcomes.sort_by_key(|o| targets.iter().position(|t| t == o.node()));

        Ok(outcomes)
    }

    /// Records `value` on `name` and, for dependent nodes, reloads the successor.
    pub async fn select(&self, name: &str, value: &str) -> Result<SelectionOutcome, ChainError> {
        let action = self.lock().apply_selection(name, value)?;
        Ok(self.perform(action).await)
    }

    /// Re-runs the lookup for `name` with its current upstream filter.
    pub async fn refresh(&self, name: &str) -> Result<SelectionOutcome, ChainError> {
        let action = self.lock().request_options(name)?;
        Ok(self.perform(action).await)
    }

    /// A copy of the chain as it stands right now.
    pub fn snapshot(&self) -> Chain {
        self.lock().clone()
    }

    async fn perform(&self, action: ChainAction) -> SelectionOutcome {
        match action {
            ChainAction::Refresh(ticket) => SelectionOutcome::Lookup(self.run(ticket).await),
            ChainAction::Terminal => SelectionOutcome::Terminal,
            ChainAction::Blocked { node, missing } => SelectionOutcome::Blocked { node, missing },
            ChainAction::Independent => SelectionOutcome::Independent,
        }
    }

    async fn run(&self, ticket: RefreshTicket) -> RefreshOutcome {
        let result = self.service.lookup(&ticket.request).await;
        self.lock().complete_refresh(&ticket, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{LookupRecord, LookupRequest, OptionsState, SelectorDecl},
        system::lookup::LookupError,
    };
    use async_trait::async_trait;

    /// Fails every lookup against `failing_table`.
    struct FailingTable {
        failing_table: &'static str,
    }

    #[async_trait]
    impl LookupService for FailingTable {
        async fn lookup(&self, request: &LookupRequest) -> Result<Vec<LookupRecord>, LookupError> {
            if request.table == self.failing_table {
                return Err(LookupError::Malformed("expected value at line 1".to_string()));
            }
            Ok(vec![LookupRecord::new("SCCWRP", "SCCWRP")])
        }
    }

    fn chain() -> Chain {
        Chain::new(vec![
            SelectorDecl::new("login_email", 0, "email", "email", "lu_users"),
            SelectorDecl::new("login_agency", 1, "agency", "agencyname", "lu_agency"),
            SelectorDecl::new("login_datatype", 2, "datatype", "datatype", "lu_datatype"),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_initialize_reports_failed_root_without_erroring() {
        let resolver = ChainResolver::new(chain(), FailingTable { failing_table: "lu_users" });

        let outcomes = resolver.initialize().await.unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(matches!(
            &outcomes[0],
            RefreshOutcome::Failed { node, reason } if node == "login_email" && reason.contains("malformed")
        ));
        assert_eq!(
            outcomes[1],
            RefreshOutcome::Applied {
                node: "login_agency".to_string(),
                choices: 1
            }
        );

        let snapshot = resolver.snapshot();
        let email = snapshot.node("login_email").unwrap();
        assert!(email.options.is_empty());
        assert!(matches!(email.state, OptionsState::Failed { .. }));
        assert_eq!(snapshot.node("login_agency").unwrap().state, OptionsState::Ready);
    }

    #[tokio::test]
    async fn test_dependents_load_while_a_root_has_failed() {
        let resolver = ChainResolver::new(chain(), FailingTable { failing_table: "lu_users" });
        resolver.initialize().await.unwrap();

        let outcome = resolver.select("login_agency", "SCCWRP").await.unwrap();
        assert!(matches!(
            outcome,
            SelectionOutcome::Lookup(RefreshOutcome::Applied { ref node, .. }) if node == "login_datatype"
        ));

        // The failed root offers nothing to pick.
        let err = resolver.select("login_email", "SCCWRP").await.unwrap_err();
        assert!(matches!(err, ChainError::UnknownOption { .. }));
    }
}
