//! The generation pipeline: load profile, build prompt, call the model,
//! validate its answer, persist.

use std::{fmt, sync::Arc};

use time::{Date, Duration};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    model::{DietPlan, NewDietPlan, PlanBody, PLAN_DAYS},
    parser::{audit_totals, parse_plan},
    prompt::build_prompt,
    repo::PlanStore,
};
use crate::{error::PlanError, llm::RetryingClient, nutrition::PlanInputs, users::ProfileStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Loading,
    Building,
    Calling,
    Parsing,
    Persisting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Loading => "loading",
            Stage::Building => "building",
            Stage::Calling => "calling",
            Stage::Parsing => "parsing",
            Stage::Persisting => "persisting",
        })
    }
}

impl NewDietPlan {
    /// Names and dates a validated plan. The week runs `today..=today+6`.
    pub fn from_validated(user_id: Uuid, inputs: &PlanInputs, body: PlanBody, today: Date) -> Self {
        Self {
            user_id,
            plan_name: format!("1-Week {} Diet Plan", inputs.diet_preference.title()),
            start_date: today,
            end_date: today + Duration::days(PLAN_DAYS as i64 - 1),
            total_calories: body.total_calories_per_day,
            plan_data: body,
        }
    }
}

#[derive(Clone)]
pub struct PlanGenerator {
    profiles: Arc<dyn ProfileStore>,
    llm: RetryingClient,
    plans: Arc<dyn PlanStore>,
}

impl PlanGenerator {
    pub fn new(profiles: Arc<dyn ProfileStore>, llm: RetryingClient, plans: Arc<dyn PlanStore>) -> Self {
        Self { profiles, llm, plans }
    }

    /// Runs the whole pipeline for one user. Returns the stored plan, or the
    /// first failure; a failed run leaves no row behind.
    #[instrument(skip(self))]
    pub async fn generate(&self, user_id: Uuid, today: Date) -> Result<DietPlan, PlanError> {
        let mut stage = Stage::Loading;
        info!(%stage, "diet plan generation started");

        let profile = self
            .profiles
            .find_profile(user_id)
            .await
            .map_err(PlanError::PersistenceError)
            .and_then(|found| found.ok_or(PlanError::ProfileNotFound))
            .map_err(|e| {
                warn!(%stage, code = e.code(), error = %e, "generation failed");
                e
            })?;

        stage = Stage::Building;
        info!(%stage, "building prompt");
        let inputs = PlanInputs::from_profile(&profile);
        let prompt = build_prompt(&inputs, today);

        stage = Stage::Calling;
        info!(%stage, daily_calories = inputs.daily_calories, "requesting plan from model");
        let raw = self.llm.complete(&prompt).await.map_err(|e| {
            warn!(%stage, code = e.code(), "generation failed");
            e
        })?;

        stage = Stage::Parsing;
        info!(%stage, bytes = raw.len(), "validating model response");
        let body = parse_plan(&raw).map_err(|e| {
            warn!(%stage, error = %e, "generation failed");
            e
        })?;
        for m in audit_totals(&body) {
            warn!(
                day = m.day,
                meal = m.meal,
                field = m.field,
                declared = m.declared,
                summed = m.summed,
                "meal totals disagree with foods"
            );
        }

        stage = Stage::Persisting;
        info!(%stage, "storing diet plan");
        let plan = self
            .plans
            .insert_plan(NewDietPlan::from_validated(user_id, &inputs, body, today))
            .await
            .map_err(|e| {
                warn!(%stage, error = %e, "generation failed");
                e
            })?;

        info!(plan_id = %plan.id, "diet plan generated");
        Ok(plan)
    }
}
