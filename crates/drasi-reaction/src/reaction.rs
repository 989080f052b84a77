//! Reaction lifecycle
//!
//! [`ReactionBuilder`] collects callbacks, a configuration parser, and
//! setting overrides; [`Reaction::subscribe`] discovers the queries and
//! wires one webhook route per query; [`Reaction::start`] serves those
//! routes until the process is stopped.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ReactionSettings;
use crate::dispatch::{query_route, DispatchState};
use crate::error::{ReactionError, ReactionResult};
use crate::handlers::{
    ChangeClosureHandler, ChangeEventHandler, ControlClosureHandler, ControlEventHandler,
};
use crate::logging;
use crate::models::{ChangeEvent, ControlEvent};
use crate::queries::{
    load_query_configs, JsonQueryConfigParser, QueryConfigParser, YamlQueryConfigParser,
};

/// One entry in the subscription manifest served at `/dapr/subscribe`.
///
/// The sidecar reads this to bind each query's result topic to the
/// reaction's route for that query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuerySubscription {
    pub pubsubname: String,
    pub topic: String,
    pub route: String,
}

/// A configured reaction, ready to subscribe and serve.
///
/// The type parameter `Q` is the per-query configuration type; it defaults
/// to [`serde_json::Value`] for reactions that treat configuration as
/// free-form data.
pub struct Reaction<Q = Value> {
    settings: ReactionSettings,
    parser: Option<Box<dyn QueryConfigParser<Q>>>,
    on_change: Arc<dyn ChangeEventHandler<Q>>,
    on_control: Option<Arc<dyn ControlEventHandler<Q>>>,
    query_configs: Arc<HashMap<String, Option<Arc<Q>>>>,
    subscriptions: Vec<QuerySubscription>,
    router: Option<Router>,
}

impl Reaction {
    /// Builder for a reaction whose query configurations stay free-form
    /// JSON. Use [`ReactionBuilder::new`] to pick a typed configuration.
    pub fn builder() -> ReactionBuilder {
        ReactionBuilder::new()
    }
}

impl<Q> Reaction<Q>
where
    Q: Send + Sync + 'static,
{
    /// Discovers the queries this reaction serves and builds the webhook
    /// router: one POST route per query id, plus the subscription
    /// manifest at `/dapr/subscribe`.
    ///
    /// [`Reaction::start`] calls this when it has not been called yet;
    /// call it directly to inspect [`Reaction::query_configs`] or
    /// [`Reaction::subscriptions`] before serving.
    pub fn subscribe(&mut self) -> ReactionResult<()> {
        let query_configs = Arc::new(load_query_configs(
            &self.settings.query_config_directory,
            self.parser.as_deref(),
        )?);

        let state = DispatchState {
            query_configs: query_configs.clone(),
            on_change: self.on_change.clone(),
            on_control: self.on_control.clone(),
        };

        let mut subscriptions = Vec::with_capacity(query_configs.len());
        let mut router = Router::new();
        for query_id in query_configs.keys() {
            info!("Subscribing to query `{}`", query_id);
            subscriptions.push(QuerySubscription {
                pubsubname: self.settings.pubsub_name.clone(),
                topic: format!("{}-results", query_id),
                route: format!("/{}", query_id),
            });
            router = router.route(
                &format!("/{}", query_id),
                query_route(state.clone(), query_id.clone()),
            );
        }

        let declarations = subscriptions.clone();
        router = router.route(
            "/dapr/subscribe",
            get(move || {
                let declarations = declarations.clone();
                async move { Json(declarations) }
            }),
        );

        self.query_configs = query_configs;
        self.subscriptions = subscriptions;
        self.router = Some(router);
        Ok(())
    }

    /// Serves the reaction until the process is stopped.
    ///
    /// Initializes logging, subscribes if [`Reaction::subscribe`] has not
    /// run yet, and binds `0.0.0.0` on the configured port.
    pub async fn start(mut self) -> ReactionResult<()> {
        logging::init_logging();
        info!("Starting reaction");

        if self.router.is_none() {
            self.subscribe()?;
        }
        let router = match self.router.take() {
            Some(router) => router,
            None => {
                return Err(ReactionError::Config(
                    "Subscription did not produce a router".to_string(),
                ))
            }
        };

        let addr = SocketAddr::from(([0, 0, 0, 0], self.settings.port));
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Reaction listening on {}", local_addr);
        axum::serve(listener, router).await?;
        Ok(())
    }

    /// The discovered query id to configuration map. Empty until
    /// [`Reaction::subscribe`] runs.
    pub fn query_configs(&self) -> &HashMap<String, Option<Arc<Q>>> {
        &self.query_configs
    }

    /// The subscription manifest entries. Empty until
    /// [`Reaction::subscribe`] runs.
    pub fn subscriptions(&self) -> &[QuerySubscription] {
        &self.subscriptions
    }

    /// The webhook router, for serving through an existing server or
    /// exercising routes in-process.
    pub fn router(&self) -> ReactionResult<Router> {
        match &self.router {
            Some(router) => Ok(router.clone()),
            None => Err(ReactionError::Config(
                "Call subscribe() before taking the router".to_string(),
            )),
        }
    }

    /// Effective settings after environment overrides and builder calls.
    pub fn settings(&self) -> &ReactionSettings {
        &self.settings
    }
}

/// Builder for [`Reaction`].
///
/// Settings start from the environment (see [`ReactionSettings::from_env`])
/// so deployed reactions need no explicit configuration; the `with_*`
/// methods override individual values for local runs and tests.
pub struct ReactionBuilder<Q = Value> {
    settings: ReactionSettings,
    parser: Option<Box<dyn QueryConfigParser<Q>>>,
    on_change: Option<Arc<dyn ChangeEventHandler<Q>>>,
    on_control: Option<Arc<dyn ControlEventHandler<Q>>>,
}

impl<Q> ReactionBuilder<Q>
where
    Q: Send + Sync + 'static,
{
    pub fn new() -> Self {
        ReactionBuilder {
            settings: ReactionSettings::from_env(),
            parser: None,
            on_change: None,
            on_control: None,
        }
    }

    /// Registers the change event callback. Required.
    pub fn on_change_event<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(ChangeEvent, Option<Arc<Q>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_change = Some(Arc::new(ChangeClosureHandler(callback)));
        self
    }

    /// Registers the control event callback. Optional; without one,
    /// control events are acknowledged and dropped.
    pub fn on_control_event<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(ControlEvent, Option<Arc<Q>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_control = Some(Arc::new(ControlClosureHandler(callback)));
        self
    }

    /// Registers a typed change event handler in place of a closure.
    pub fn with_change_handler<H>(mut self, handler: H) -> Self
    where
        H: ChangeEventHandler<Q> + 'static,
    {
        self.on_change = Some(Arc::new(handler));
        self
    }

    /// Registers a typed control event handler in place of a closure.
    pub fn with_control_handler<H>(mut self, handler: H) -> Self
    where
        H: ControlEventHandler<Q> + 'static,
    {
        self.on_control = Some(Arc::new(handler));
        self
    }

    /// Sets the strategy for parsing query configuration files. Without
    /// one, discovered queries carry no configuration.
    pub fn with_query_config_parser<P>(mut self, parser: P) -> Self
    where
        P: QueryConfigParser<Q> + 'static,
    {
        self.parser = Some(Box::new(parser));
        self
    }

    /// Parses query configuration files as YAML into `Q`.
    pub fn with_yaml_query_configs(self) -> Self
    where
        Q: DeserializeOwned,
    {
        self.with_query_config_parser(YamlQueryConfigParser)
    }

    /// Parses query configuration files as JSON into `Q`.
    pub fn with_json_query_configs(self) -> Self
    where
        Q: DeserializeOwned,
    {
        self.with_query_config_parser(JsonQueryConfigParser)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.settings.port = port;
        self
    }

    pub fn with_pubsub_name(mut self, pubsub_name: impl Into<String>) -> Self {
        self.settings.pubsub_name = pubsub_name.into();
        self
    }

    pub fn with_query_config_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.settings.query_config_directory = directory.into();
        self
    }

    pub fn build(self) -> ReactionResult<Reaction<Q>> {
        let on_change = match self.on_change {
            Some(on_change) => on_change,
            None => {
                return Err(ReactionError::Config(
                    "No change event handler registered".to_string(),
                ))
            }
        };

        Ok(Reaction {
            settings: self.settings,
            parser: self.parser,
            on_change,
            on_control: self.on_control,
            query_configs: Arc::new(HashMap::new()),
            subscriptions: Vec::new(),
            router: None,
        })
    }
}

impl<Q> Default for ReactionBuilder<Q>
where
    Q: Send + Sync + 'static,
{
    fn default() -> Self {
        ReactionBuilder::new()
    }
}
