//! Callback traits for dispatched events
//!
//! Reactions supply behavior either as an async closure or as a type
//! implementing one of these traits. Closures are wrapped in the adapter
//! structs below so dispatch only ever deals with trait objects.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{ChangeEvent, ControlEvent};

/// Receives every validated change event, together with the configuration
/// of the query named in the event payload (if any).
///
/// An `Err` fails the delivery it was invoked for; the reaction itself
/// keeps running.
#[async_trait]
pub trait ChangeEventHandler<Q>: Send + Sync {
    async fn handle_change(&self, event: ChangeEvent, config: Option<Arc<Q>>)
        -> anyhow::Result<()>;
}

/// Receives every validated control event. Registering one is optional;
/// without it control events are acknowledged and dropped.
#[async_trait]
pub trait ControlEventHandler<Q>: Send + Sync {
    async fn handle_control_signal(
        &self,
        event: ControlEvent,
        config: Option<Arc<Q>>,
    ) -> anyhow::Result<()>;
}

pub(crate) struct ChangeClosureHandler<F>(pub(crate) F);

#[async_trait]
impl<Q, F, Fut> ChangeEventHandler<Q> for ChangeClosureHandler<F>
where
    Q: Send + Sync + 'static,
    F: Fn(ChangeEvent, Option<Arc<Q>>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn handle_change(
        &self,
        event: ChangeEvent,
        config: Option<Arc<Q>>,
    ) -> anyhow::Result<()> {
        (self.0)(event, config).await
    }
}

pub(crate) struct ControlClosureHandler<F>(pub(crate) F);

#[async_trait]
impl<Q, F, Fut> ControlEventHandler<Q> for ControlClosureHandler<F>
where
    Q: Send + Sync + 'static,
    F: Fn(ControlEvent, Option<Arc<Q>>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn handle_control_signal(
        &self,
        event: ControlEvent,
        config: Option<Arc<Q>>,
    ) -> anyhow::Result<()> {
        (self.0)(event, config).await
    }
}
