// src/state.rs

use crate::clients::{compute::ComputeClient, email::EmailClient, gateway::GatewayClient};
use crate::config::Config;
use axum::extract::FromRef;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub compute: ComputeClient,
    pub gateway: GatewayClient,
    pub email: EmailClient,
}

impl AppState {
    /// Builds the shared state, constructing one HTTP client per upstream.
    pub fn new(pool: PgPool, config: Config) -> Self {
        let compute = ComputeClient::new(&config);
        let gateway = GatewayClient::new(&config);
        let email = EmailClient::new(&config);
        AppState {
            pool,
            config,
            compute,
            gateway,
            email,
        }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for ComputeClient {
    fn from_ref(state: &AppState) -> Self {
        state.compute.clone()
    }
}

impl FromRef<AppState> for GatewayClient {
    fn from_ref(state: &AppState) -> Self {
        state.gateway.clone()
    }
}

impl FromRef<AppState> for EmailClient {
    fn from_ref(state: &AppState) -> Self {
        state.email.clone()
    }
}
