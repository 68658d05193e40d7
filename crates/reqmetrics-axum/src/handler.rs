//! Handler interceptor.
//!
//! [`Instrumented`] runs the wrapped handler to completion, then records the
//! request against the final response status. The response is returned
//! untouched. A handler that panics or is dropped mid-flight records nothing.

use std::marker::PhantomData;
use std::sync::Arc;

use axum::extract::Request;
use axum::handler::Handler;
use axum::response::Response;
use futures_util::future::BoxFuture;

use crate::instrument::Instrument;

/// A handler wrapped by [`Instrument::wrap`].
pub struct Instrumented<H, T> {
    handler: H,
    instrument: Instrument,
    full_path: Arc<str>,
    _marker: PhantomData<fn() -> T>,
}

impl<H, T> Instrumented<H, T> {
    pub(crate) fn new(handler: H, instrument: Instrument, full_path: Arc<str>) -> Self {
        Self {
            handler,
            instrument,
            full_path,
            _marker: PhantomData,
        }
    }

    /// Path label this handler records under (API group included).
    pub fn full_path(&self) -> &str {
        &self.full_path
    }
}

impl<H: Clone, T> Clone for Instrumented<H, T> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            instrument: self.instrument.clone(),
            full_path: Arc::clone(&self.full_path),
            _marker: PhantomData,
        }
    }
}

impl<H, T, S> Handler<T, S> for Instrumented<H, T>
where
    H: Handler<T, S>,
    T: 'static,
    S: Send + 'static,
{
    type Future = BoxFuture<'static, Response>;

    fn call(self, req: Request, state: S) -> Self::Future {
        let Self {
            handler,
            instrument,
            full_path,
            ..
        } = self;

        let method = req.method().clone();
        let started = instrument.start_timer();
        let fut = handler.call(req, state);

        Box::pin(async move {
            let response = fut.await;
            instrument.record(
                method.as_str(),
                &full_path,
                response.status().as_str(),
                started,
            );
            response
        })
    }
}
