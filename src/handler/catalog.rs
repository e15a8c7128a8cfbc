use async_trait::async_trait;
use http::{Response, StatusCode};
use serde::Serialize;

use crate::{
    core::{SiteContext, SiteResult},
    utils::{request::SiteRequest, response::ResponseBuilder},
};

use super::{Handler, Params};

#[derive(Debug, Serialize)]
pub struct ServiceEntry {
    pub id: u32,
    pub name: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TeamMember {
    pub id: u32,
    pub name: &'static str,
    pub role: &'static str,
    pub expertise: &'static str,
}

pub const SERVICES: &[ServiceEntry] = &[
    ServiceEntry { id: 1, name: "Web & Mobile App Development" },
    ServiceEntry { id: 2, name: "Cloud Migration" },
    ServiceEntry { id: 3, name: "Cybersecurity" },
    ServiceEntry { id: 4, name: "IT Infrastructure" },
    ServiceEntry { id: 5, name: "Digital Transformation" },
    ServiceEntry { id: 6, name: "Data Analytics" },
    ServiceEntry { id: 7, name: "IT Strategy" },
];

pub const TEAM: &[TeamMember] = &[
    TeamMember {
        id: 1,
        name: "Sarah Johnson",
        role: "Chief Technology Officer",
        expertise: "Cloud Architecture, Digital Transformation",
    },
    TeamMember {
        id: 2,
        name: "Michael Chen",
        role: "Cybersecurity Specialist",
        expertise: "Threat Assessment, Risk Management",
    },
    TeamMember {
        id: 3,
        name: "Emily Rodriguez",
        role: "Data Analytics Director",
        expertise: "Business Intelligence, Data Science",
    },
    TeamMember {
        id: 4,
        name: "David Kumar",
        role: "Infrastructure Architect",
        expertise: "Scalable Infrastructure, Cloud Design",
    },
];

/// Fixed marketing listings served as `{success, data}`.
pub enum CatalogHandler {
    Services,
    Team,
}

#[async_trait]
impl Handler for CatalogHandler {
    async fn handle(
        &self,
        _ctx: &SiteContext,
        _request: &SiteRequest,
        _params: Params,
    ) -> SiteResult<Response<Vec<u8>>> {
        Ok(match self {
            CatalogHandler::Services => ResponseBuilder::success(StatusCode::OK, None, Some(SERVICES)),
            CatalogHandler::Team => ResponseBuilder::success(StatusCode::OK, None, Some(TEAM)),
        })
    }
}
