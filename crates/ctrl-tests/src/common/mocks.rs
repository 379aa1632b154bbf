// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! Recording status sinks, counting certificate providers and scripted
//! method handlers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use ctrl_core::{FnHandler, MethodHandler, ServerError, ServerResult, Value};
use ctrl_server::{
    ApplicationCertificate, CertificateProvider, CertificateRequest, StatusSink,
};

// =============================================================================
// RecordingSink
// =============================================================================

/// Collects every status line.
#[derive(Debug, Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<String>>,
}

impl RecordingSink {
    /// Creates an empty sink.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns all lines in emission order.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Returns the lines containing `needle`.
    pub fn matching(&self, needle: &str) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|l| l.contains(needle))
            .cloned()
            .collect()
    }

    /// Returns the number of lines.
    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    /// Returns `true` if nothing was emitted.
    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    /// Drops all recorded lines.
    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl StatusSink for RecordingSink {
    fn emit(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}

// =============================================================================
// CountingProvider
// =============================================================================

/// Serves a fixed certificate and counts requests.
#[derive(Debug)]
pub struct CountingProvider {
    certificate: Option<ApplicationCertificate>,
    calls: AtomicUsize,
}

impl CountingProvider {
    /// Always succeeds with `certificate`.
    pub fn serving(certificate: ApplicationCertificate) -> Arc<Self> {
        Arc::new(Self {
            certificate: Some(certificate),
            calls: AtomicUsize::new(0),
        })
    }

    /// Always fails.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            certificate: None,
            calls: AtomicUsize::new(0),
        })
    }

    /// Returns the number of `obtain` calls.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CertificateProvider for CountingProvider {
    fn name(&self) -> &str {
        "counting"
    }

    async fn obtain(&self, _request: &CertificateRequest) -> ServerResult<ApplicationCertificate> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.certificate
            .clone()
            .ok_or_else(|| ServerError::certificate_invalid("test provider has no certificate"))
    }
}

// =============================================================================
// Method Handlers
// =============================================================================

/// Scripted method handlers.
pub struct Handlers;

impl Handlers {
    /// Returns its inputs unchanged.
    pub fn echo() -> Arc<dyn MethodHandler> {
        FnHandler::pure(|_, inputs| Ok(inputs.to_vec()))
    }

    /// Returns `outputs` regardless of inputs.
    pub fn returning(outputs: Vec<Value>) -> Arc<dyn MethodHandler> {
        FnHandler::pure(move |_, _| Ok(outputs.clone()))
    }

    /// Fails with `error`.
    pub fn failing(error: fn() -> ServerError) -> Arc<dyn MethodHandler> {
        FnHandler::pure(move |_, _| Err(error()))
    }

    /// Panics when called.
    pub fn panicking() -> Arc<dyn MethodHandler> {
        FnHandler::pure(|_, _| panic!("scripted handler failure"))
    }
}
