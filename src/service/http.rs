use async_trait::async_trait;
use http::Response;
use pingora::{
    apps::http_app::ServeHttp, protocols::http::ServerSession, services::listening::Service,
};
use pingora_core::listeners::tls::TlsSettings;
use pingora_error::Result;

use crate::{
    config::{Site, Tls},
    core::SiteContext,
    utils::request::SiteRequest,
};

use super::{assets::StaticAssets, cors::CorsPolicy, dispatch::Dispatcher};

const SITE_SERVICE: &str = "avalance-site";

/// HTTP application serving the site: API routes plus static files.
pub struct SiteHttpApp {
    dispatcher: Dispatcher,
}

impl SiteHttpApp {
    pub fn new(site: &Site) -> Self {
        let ctx = SiteContext::from_site(site);
        let cors = CorsPolicy::for_deployment(site.cors.as_ref(), site.deployment);
        let assets = StaticAssets::new(site.assets.as_ref().map(|a| a.root.clone()));
        Self {
            dispatcher: Dispatcher::new(ctx, cors, assets),
        }
    }

    pub fn site_http_service(site: &Site) -> Result<Service<Self>> {
        let app = Self::new(site);
        let mut service = Service::new(SITE_SERVICE.to_string(), app);

        for listener in &site.listeners {
            let addr = listener.address.to_string();
            match &listener.tls {
                Some(Tls {
                    cert_path,
                    key_path,
                }) => {
                    let mut settings = TlsSettings::intermediate(cert_path, key_path)?;
                    settings.enable_h2();
                    service.add_tls_with_settings(&addr, None, settings);
                }
                None => service.add_tcp(&addr),
            }
            log::info!("Listening on {addr}");
        }

        Ok(service)
    }
}

#[async_trait]
impl ServeHttp for SiteHttpApp {
    async fn response(&self, http_session: &mut ServerSession) -> Response<Vec<u8>> {
        let (request, read_error) = SiteRequest::from_session(http_session).await;
        if read_error.is_some() {
            http_session.set_keepalive(None);
        }

        let resp = self.dispatcher.dispatch(&request, read_error).await;
        log::info!(
            "{} {} {}",
            request.method,
            request.path,
            resp.status().as_u16()
        );
        resp
    }
}
