//! Connect/disconnect, liveness and schema operations.

use super::{boundary, ConnectedState, OrmFacade, SessionScope};
use crate::config::ConnectParams;
use crate::error::{OrmError, OrmResult};
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Instant;

impl OrmFacade {
    /// Builds configuration and session factory, runs a schema update and
    /// publishes the result.
    ///
    /// # Invariants
    /// - Any previously held factory is released first, even if this
    ///   attempt then fails; a failed connect leaves the facade
    ///   disconnected.
    /// - Nothing is published until the schema update has succeeded.
    pub fn try_connect(&self, params: &ConnectParams) -> OrmResult<()> {
        let started_at = Instant::now();
        info!(
            "event=connect module=facade status=start runtime={} kind={}",
            self.runtime.name(),
            params.kind
        );

        self.release_current("reconnect");

        let result = self.build_state(params);
        let state = match result {
            Ok(state) => state,
            Err(err) => {
                error!(
                    "event=connect module=facade status=error kind={} duration_ms={} error_code={} error={}",
                    params.kind,
                    started_at.elapsed().as_millis(),
                    err.code(),
                    err
                );
                return Err(err);
            }
        };

        let target = state.configuration.descriptor().redacted();
        if let Some(raced) = self.slot.swap(Some(Arc::new(state))) {
            // A concurrent connect published in between; last writer wins.
            close_factory(&raced, "superseded");
        }

        info!(
            "event=connect module=facade status=ok kind={} target={} duration_ms={}",
            params.kind,
            target,
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    /// Boundary form of `try_connect`. Failures are already logged there.
    pub fn connect(&self, params: &ConnectParams) -> bool {
        self.try_connect(params).is_ok()
    }

    /// Releases the session factory. A no-op when nothing is held.
    pub fn try_disconnect(&self) -> OrmResult<()> {
        let Some(state) = self.slot.swap(None) else {
            return Ok(());
        };

        state
            .factory
            .close()
            .map_err(OrmError::Connectivity)?;
        info!(
            "event=disconnect module=facade status=ok kind={}",
            state.configuration.kind()
        );
        Ok(())
    }

    /// Boundary form of `try_disconnect`.
    pub fn disconnect(&self) -> bool {
        boundary("disconnect", self.try_disconnect().map(|()| true), false)
    }

    /// Liveness check: opens a throwaway session and asks whether it is
    /// open and connected. Performs real I/O.
    pub fn try_is_connected(&self) -> OrmResult<bool> {
        let state = self.snapshot()?;
        let scope = SessionScope::open(state.factory.as_ref())?;
        let alive = scope.session().is_open() && scope.session().is_connected();
        scope.close();
        Ok(alive)
    }

    /// Boundary form of `try_is_connected`; any failure reads as `false`.
    pub fn is_connected(&self) -> bool {
        self.try_is_connected().unwrap_or(false)
    }

    /// Applies additive schema changes for all registered mappings.
    pub fn try_update_schema(&self) -> OrmResult<()> {
        let state = self.snapshot()?;
        self.runtime
            .update_schema(&state.configuration)
            .map_err(OrmError::Schema)
    }

    pub fn update_schema(&self) -> bool {
        boundary(
            "schema_update",
            self.try_update_schema().map(|()| true),
            false,
        )
    }

    /// Drops and recreates every mapped table. Erases all data.
    pub fn try_reset_schema(&self) -> OrmResult<()> {
        let state = self.snapshot()?;
        warn!(
            "event=schema_reset module=facade status=start kind={} tables={}",
            state.configuration.kind(),
            state.configuration.mappings().len()
        );
        self.runtime
            .export_schema(&state.configuration)
            .map_err(OrmError::Schema)
    }

    pub fn reset_schema(&self) -> bool {
        boundary(
            "schema_reset",
            self.try_reset_schema().map(|()| true),
            false,
        )
    }

    fn build_state(&self, params: &ConnectParams) -> OrmResult<ConnectedState> {
        params.validate()?;

        let configuration = self
            .runtime
            .build_configuration(params, &self.mappings)
            .map_err(|err| OrmError::from_runtime(OrmError::Connectivity, err))?;
        let factory = self
            .runtime
            .build_session_factory(&configuration)
            .map_err(OrmError::Connectivity)?;

        if let Err(err) = self.runtime.update_schema(&configuration) {
            if let Err(close_err) = factory.close() {
                warn!(
                    "event=connect module=facade status=warn stage=factory_close error={}",
                    close_err
                );
            }
            return Err(OrmError::Schema(err));
        }

        Ok(ConnectedState {
            configuration,
            factory,
        })
    }

    fn release_current(&self, reason: &'static str) {
        if let Some(previous) = self.slot.swap(None) {
            close_factory(&previous, reason);
        }
    }
}

fn close_factory(state: &ConnectedState, reason: &'static str) {
    match state.factory.close() {
        Ok(()) => info!(
            "event=disconnect module=facade status=ok trigger={} kind={}",
            reason,
            state.configuration.kind()
        ),
        Err(err) => warn!(
            "event=disconnect module=facade status=warn trigger={} error={}",
            reason, err
        ),
    }
}
