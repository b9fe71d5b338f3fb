use crate::errors::SubscriptionError;
use crate::handlers::session::SessionManager;
use crate::handlers::stripe::{CardDetails, PaymentTokenizer};
use crate::models::all_models::{SubscribeRequest, SubscriptionPlan};
use crate::routes::payments::PaymentsApi;
use crate::routes::subscription_plans::PlansApi;
use log::{error, info};
use std::sync::Arc;

/// Plan purchase for a company account: load plans, pick one, confirm.
///
/// A failed confirmation keeps the selection so the purchase can be retried;
/// nothing about the session or the loaded plans changes.
pub struct SubscriptionFlow {
    session: Arc<SessionManager>,
    plans_api: Arc<dyn PlansApi>,
    payments_api: Arc<dyn PaymentsApi>,
    tokenizer: Arc<dyn PaymentTokenizer>,
    plans: Vec<SubscriptionPlan>,
    selected: Option<SubscriptionPlan>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionReceipt {
    pub company_id: i64,
    pub plan: SubscriptionPlan,
}

impl SubscriptionFlow {
    pub fn new(
        session: Arc<SessionManager>,
        plans_api: Arc<dyn PlansApi>,
        payments_api: Arc<dyn PaymentsApi>,
        tokenizer: Arc<dyn PaymentTokenizer>,
    ) -> Self {
        SubscriptionFlow {
            session,
            plans_api,
            payments_api,
            tokenizer,
            plans: Vec::new(),
            selected: None,
        }
    }

    pub async fn load_plans(&mut self) -> Result<&[SubscriptionPlan], SubscriptionError> {
        let bearer = self.session.bearer()?;
        self.plans = self.plans_api.subscription_plans(&bearer).await?;
        Ok(&self.plans)
    }

    pub fn plans(&self) -> &[SubscriptionPlan] {
        &self.plans
    }

    pub fn selected(&self) -> Option<&SubscriptionPlan> {
        self.selected.as_ref()
    }

    /// Opens the confirmation step for one of the loaded plans.
    pub fn select(&mut self, plan_id: i64) -> Result<&SubscriptionPlan, SubscriptionError> {
        let plan = self
            .plans
            .iter()
            .find(|p| p.subscription_plan_id == plan_id)
            .cloned()
            .ok_or(SubscriptionError::UnknownPlan(plan_id))?;
        Ok(self.selected.insert(plan))
    }

    pub fn cancel(&mut self) {
        self.selected = None;
    }

    /// Tokenizes the card and subscribes the signed-in user's company to the
    /// selected plan.
    pub async fn confirm(
        &mut self,
        card: &CardDetails,
    ) -> Result<SubscriptionReceipt, SubscriptionError> {
        let plan = self.selected.clone().ok_or(SubscriptionError::NoPlanSelected)?;
        let company_id = self
            .session
            .profile()
            .and_then(|p| p.company_id())
            .ok_or(SubscriptionError::MissingCompany)?;
        let bearer = self.session.bearer()?;

        let result = async {
            let stripe_token = self.tokenizer.create_card_token(card).await?;
            let request = SubscribeRequest {
                company_id,
                subscription_plan_id: plan.subscription_plan_id,
                stripe_token,
            };
            self.payments_api.subscribe_to_plan(&bearer, &request).await?;
            Ok::<_, SubscriptionError>(())
        }
        .await;

        match result {
            Ok(()) => {
                info!(
                    "Company {} subscribed to plan {} ({})",
                    company_id, plan.subscription_plan_id, plan.plan_name
                );
                self.selected = None;
                Ok(SubscriptionReceipt { company_id, plan })
            }
            Err(e) => {
                error!("Subscription failed: {}", e);
                Err(e)
            }
        }
    }
}
