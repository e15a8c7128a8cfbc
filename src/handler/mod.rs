//! Request handlers behind the API routes.
//!
//! Each handler works on a [`SiteRequest`] and the shared [`SiteContext`],
//! and returns either a response or a [`SiteError`](crate::core::SiteError)
//! for the dispatcher to map.

pub mod admin;
pub mod catalog;
pub mod health;
pub mod submission;

use std::collections::BTreeMap;

use async_trait::async_trait;
use http::Response;

use crate::{
    core::{SiteContext, SiteResult},
    utils::request::SiteRequest,
};

pub type Params = BTreeMap<String, String>;

#[async_trait]
pub trait Handler {
    async fn handle(
        &self,
        ctx: &SiteContext,
        request: &SiteRequest,
        params: Params,
    ) -> SiteResult<Response<Vec<u8>>>;
}
