//! Turn metrics and the completion log line.
//!
//! # Metrics Emitted
//!
//! - `parley_turns_total{activity_type, outcome}`
//! - `parley_turn_duration_seconds{activity_type}`
//! - `parley_in_flight_turns`
//!
//! # Log Format
//!
//! One `info` event per turn with `turn_id`, `activity_type`, `route`,
//! `outcome`, `status` (invoke turns only) and `duration_ms`. Failed turns log
//! at `warn` with the error text.

use crate::middleware::{BoxFuture, MatchedRoute, Middleware, Next, TurnResult};
use parley_core::{CancellationToken, TurnContext};
use parley_telemetry::metrics::{record_turn, InFlightGuard, TurnOutcome};
use std::time::Instant;

/// Middleware that records turn metrics and logs turn completion.
#[derive(Debug, Clone)]
pub struct TelemetryMiddleware {
    service_name: String,
    environment: String,
}

impl TelemetryMiddleware {
    /// Creates the middleware for the named service.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            environment: "development".to_string(),
        }
    }

    /// Sets the environment label used in logs.
    #[must_use]
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Maps a finished turn to its metric outcome.
    ///
    /// A turn is unhandled when no route was picked. The response status
    /// plays no part, so a handler that answers 501 itself still counts as
    /// handled.
    #[must_use]
    pub fn outcome(result: &TurnResult, matched: bool) -> TurnOutcome {
        match result {
            Err(_) => TurnOutcome::Failed,
            Ok(_) if matched => TurnOutcome::Handled,
            Ok(_) => TurnOutcome::Unhandled,
        }
    }
}

impl Default for TelemetryMiddleware {
    fn default() -> Self {
        Self::new("parley-bot")
    }
}

impl Middleware for TelemetryMiddleware {
    fn name(&self) -> &'static str {
        "telemetry"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut TurnContext,
        next: Next<'a>,
        cancel: CancellationToken,
    ) -> BoxFuture<'a, TurnResult> {
        Box::pin(async move {
            let _in_flight = InFlightGuard::new();
            let start = Instant::now();
            let activity_type = ctx.activity().activity_type.to_string();

            let result = next.run(ctx, cancel).await;

            let duration = start.elapsed();
            let route = ctx.extension::<MatchedRoute>().map(|r| r.0.clone());
            let outcome = Self::outcome(&result, route.is_some());
            record_turn(&activity_type, outcome, duration);

            let duration_ms = duration.as_secs_f64() * 1000.0;
            let route = route.as_deref().unwrap_or("-");
            match &result {
                Ok(response) => tracing::info!(
                    service = %self.service_name,
                    environment = %self.environment,
                    turn_id = %ctx.turn_id(),
                    activity_type = %activity_type,
                    route,
                    outcome = outcome.as_str(),
                    status = response.as_ref().map(|r| r.status),
                    duration_ms,
                    "Turn completed"
                ),
                Err(error) => tracing::warn!(
                    service = %self.service_name,
                    environment = %self.environment,
                    turn_id = %ctx.turn_id(),
                    activity_type = %activity_type,
                    route,
                    outcome = outcome.as_str(),
                    error = %error,
                    duration_ms,
                    "Turn failed"
                ),
            }

            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use parley_core::fixtures::{invoke_activity, message_activity, NoopClient};
    use parley_core::{BotError, InvokeResponse};

    #[test]
    fn test_outcome_mapping() {
        let err: TurnResult = Err(BotError::handler("x"));
        assert_eq!(TelemetryMiddleware::outcome(&err, true), TurnOutcome::Failed);

        let not_impl: TurnResult = Ok(Some(InvokeResponse::not_implemented()));
        assert_eq!(TelemetryMiddleware::outcome(&not_impl, false), TurnOutcome::Unhandled);

        let fired: TurnResult = Ok(None);
        assert_eq!(TelemetryMiddleware::outcome(&fired, true), TurnOutcome::Handled);
        assert_eq!(TelemetryMiddleware::outcome(&fired, false), TurnOutcome::Unhandled);
    }

    #[test]
    fn test_handler_answering_501_is_handled() {
        let declined: TurnResult = Ok(Some(InvokeResponse::not_implemented()));
        assert_eq!(TelemetryMiddleware::outcome(&declined, true), TurnOutcome::Handled);

        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            runtime.block_on(async {
                let mut ctx = TurnContext::new(
                    NoopClient::handle(),
                    invoke_activity("task/fetch", serde_json::json!({})),
                );
                let next = Next::terminal(|ctx: &mut TurnContext, _cancel| -> BoxFuture<'static, TurnResult> {
                    ctx.extensions_mut().insert(MatchedRoute("invoke/task/fetch".to_string()));
                    Box::pin(async { Ok(Some(InvokeResponse::not_implemented())) })
                });
                let response = TelemetryMiddleware::new("test-bot")
                    .process(&mut ctx, next, CancellationToken::new())
                    .await
                    .unwrap();
                assert_eq!(response.map(|r| r.status), Some(501));
            });
        });

        let rendered = handle.render();
        assert!(rendered.contains(r#"outcome="handled""#));
        assert!(!rendered.contains(r#"outcome="unhandled""#));
    }

    #[test]
    fn test_records_turn_with_route() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            runtime.block_on(async {
                let mut ctx = TurnContext::new(NoopClient::handle(), message_activity("hi"));
                let next = Next::terminal(|ctx: &mut TurnContext, _cancel| -> BoxFuture<'static, TurnResult> {
                    ctx.extensions_mut().insert(MatchedRoute("message".to_string()));
                    Box::pin(async { Ok(None) })
                });
                TelemetryMiddleware::new("test-bot")
                    .process(&mut ctx, next, CancellationToken::new())
                    .await
                    .unwrap();
            });
        });

        let rendered = handle.render();
        assert!(rendered.contains("parley_turns_total"));
        assert!(rendered.contains(r#"outcome="handled""#));
        assert!(rendered.contains(r#"activity_type="message""#));
    }
}
