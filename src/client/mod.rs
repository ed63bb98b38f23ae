//! HTTP implementations of the remote endpoints

mod api_client;

pub use api_client::{HttpApiClient, SaveStatusResponse};
