//! Request and response interceptors.
//!
//! Interceptors are registered as `(fulfilled, rejected)` handler pairs. For one
//! call the pipeline runs
//!
//! ```text
//! reqN -> ... -> req1 -> dispatch -> resp1 -> ... -> respM
//! ```
//!
//! so the most recently registered request interceptor runs first and response
//! interceptors run in registration order. A failure skips fulfilled handlers
//! until the next stage with a rejected handler, which may recover by returning
//! a value.
//!
//! Registries can be changed while calls are in flight: each call works on a
//! snapshot taken when it starts.

use crate::{config::RequestConfig, Error, Response, Result};
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

type FulfilledFn<T> = dyn Fn(T) -> BoxFuture<'static, Result<T>> + Send + Sync;
type RejectedFn<T> = dyn Fn(Error) -> BoxFuture<'static, Result<T>> + Send + Sync;

/// Handles the value flowing through a pipeline stage.
pub struct Fulfilled<T>(Arc<FulfilledFn<T>>);

/// Handles an error raised by an earlier pipeline stage.
pub struct Rejected<T>(Arc<RejectedFn<T>>);

impl<T: Send + 'static> Fulfilled<T> {
    /// Wraps an async handler.
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self(Arc::new(move |value| Box::pin(handler(value))))
    }
}

impl<T: Send + 'static> Rejected<T> {
    /// Wraps an async error handler.
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(Error) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self(Arc::new(move |error| Box::pin(handler(error))))
    }
}

impl<T> Clone for Fulfilled<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Clone for Rejected<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

/// Identifies a registered interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterceptorId(usize);

/// A registered handler pair.
pub struct InterceptorEntry<T> {
    fulfilled: Option<Fulfilled<T>>,
    rejected: Option<Rejected<T>>,
}

impl<T> Clone for InterceptorEntry<T> {
    fn clone(&self) -> Self {
        Self {
            fulfilled: self.fulfilled.clone(),
            rejected: self.rejected.clone(),
        }
    }
}

impl<T> InterceptorEntry<T> {
    /// Runs this stage on the outcome of the previous one.
    pub async fn apply(&self, state: Result<T>) -> Result<T> {
        match (state, &self.fulfilled, &self.rejected) {
            (Ok(value), Some(fulfilled), _) => (fulfilled.0)(value).await,
            (Ok(value), None, _) => Ok(value),
            (Err(error), _, Some(rejected)) => (rejected.0)(error).await,
            (Err(error), _, None) => Err(error),
        }
    }
}

/// An ordered registry of interceptors for one phase.
///
/// Ids are handed out in increasing order and never reused. Ejecting an id
/// leaves an inactive slot so the remaining entries keep their positions.
pub struct InterceptorManager<T> {
    slots: RwLock<Vec<Option<InterceptorEntry<T>>>>,
}

impl<T: Send + 'static> InterceptorManager<T> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(Vec::new()),
        }
    }

    /// Registers a handler pair and returns its id.
    pub fn register(
        &self,
        fulfilled: Option<Fulfilled<T>>,
        rejected: Option<Rejected<T>>,
    ) -> InterceptorId {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.push(Some(InterceptorEntry {
            fulfilled,
            rejected,
        }));
        let id = InterceptorId(slots.len() - 1);
        tracing::debug!(id = id.0, "Registered interceptor");
        id
    }

    /// Registers only a fulfilled handler.
    pub fn on_fulfilled<F, Fut>(&self, handler: F) -> InterceptorId
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.register(Some(Fulfilled::new(handler)), None)
    }

    /// Registers only a rejected handler.
    pub fn on_rejected<F, Fut>(&self, handler: F) -> InterceptorId
    where
        F: Fn(Error) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.register(None, Some(Rejected::new(handler)))
    }

    /// Deactivates `id`. Returns `false` if it was unknown or already ejected.
    pub fn eject(&self, id: InterceptorId) -> bool {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let ejected = slots.get_mut(id.0).and_then(Option::take).is_some();
        if ejected {
            tracing::debug!(id = id.0, "Ejected interceptor");
        }
        ejected
    }

    /// Returns the number of active interceptors.
    pub fn len(&self) -> usize {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .flatten()
            .count()
    }

    /// Returns `true` if no interceptor is active.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the active entries in registration order.
    pub fn snapshot(&self) -> Vec<InterceptorEntry<T>> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .flatten()
            .cloned()
            .collect()
    }
}

impl<T: Send + 'static> Default for InterceptorManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// The request and response registries of a client.
#[derive(Default)]
pub struct Interceptors {
    pub request: InterceptorManager<RequestConfig>,
    pub response: InterceptorManager<Response>,
}

impl Interceptors {
    /// Runs `config` through the request interceptors, `dispatch`, and the
    /// response interceptors.
    pub async fn run<D, Fut>(&self, config: RequestConfig, dispatch: D) -> Result<Response>
    where
        D: FnOnce(RequestConfig) -> Fut,
        Fut: Future<Output = Result<Response>>,
    {
        let request_stages = self.request.snapshot();
        let response_stages = self.response.snapshot();

        let mut config = Ok(config);
        for stage in request_stages.iter().rev() {
            config = stage.apply(config).await;
        }

        let mut response = match config {
            Ok(config) => dispatch(config).await,
            Err(error) => Err(error),
        };
        for stage in &response_stages {
            response = stage.apply(response).await;
        }
        response
    }
}
