use std::collections::HashMap;

use cucumber::World;
use log::*;
use payout_engine::{
    db_types::ActorId,
    events::EventProducers,
    pipelines::{FlowError, Outcome},
    test_utils::prepare_env::{create_database, random_db_path, run_migrations},
    EngineConfig,
    PayoutApi,
    SqliteDatabase,
};

#[derive(Default, Debug, World)]
pub struct PayoutWorld {
    pub system: Option<PayoutSystem>,
    /// Actors by the name used in the feature files.
    pub actors: HashMap<String, ActorId>,
    pub last_outcome: Option<Result<Outcome, FlowError>>,
}

#[derive(Debug)]
pub struct PayoutSystem {
    pub db_path: String,
    pub api: PayoutApi<SqliteDatabase>,
}

impl PayoutWorld {
    pub fn api(&self) -> &PayoutApi<SqliteDatabase> {
        &self.system.as_ref().expect("PayoutApi not initialised").api
    }

    pub fn actor(&self, name: &str) -> ActorId {
        *self.actors.get(name).unwrap_or_else(|| panic!("No actor named {name}"))
    }

    pub fn outcome(&self) -> &Result<Outcome, FlowError> {
        self.last_outcome.as_ref().expect("No input has been sent yet")
    }
}

impl PayoutSystem {
    pub async fn new(founder: ActorId) -> Self {
        let url = prepare_test_env().await;
        let config = EngineConfig { founder_admin_id: Some(founder), ..EngineConfig::new(&url) };
        let db = SqliteDatabase::new(&config).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let api = PayoutApi::new(db, config, EventProducers::default());
        api.ensure_founder_admin().await.expect("Error adding founding admin");
        Self { db_path: url, api }
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}
