//! Weighted endpoint set
//!
//! Endpoints are created once from configuration and never removed; a failed
//! endpoint is only flagged [`EndpointStatus::Errored`] until every endpoint
//! has failed, at which point the whole set is made eligible again.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::socket::Socket;

/// Liveness flag of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointStatus {
    Ready,
    Errored,
}

/// A candidate signaling server
#[derive(Debug, Clone)]
pub struct Endpoint {
    socket: Arc<dyn Socket>,
    weight: f64,
    status: EndpointStatus,
}

impl Endpoint {
    /// Create an endpoint, rejecting negative or non-finite weights
    pub fn new(socket: Arc<dyn Socket>, weight: f64) -> Result<Self> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(TransportError::InvalidWeight {
                url: socket.url().to_string(),
                weight,
            });
        }
        Ok(Self {
            socket,
            weight,
            status: EndpointStatus::Ready,
        })
    }

    /// Endpoint with the default weight of zero
    pub fn unweighted(socket: Arc<dyn Socket>) -> Self {
        Self {
            socket,
            weight: 0.0,
            status: EndpointStatus::Ready,
        }
    }

    pub fn socket(&self) -> &Arc<dyn Socket> {
        &self.socket
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn status(&self) -> EndpointStatus {
        self.status
    }

    pub fn is_ready(&self) -> bool {
        self.status == EndpointStatus::Ready
    }
}

/// The non-empty collection of endpoints a transport chooses from
#[derive(Debug)]
pub struct EndpointSet {
    endpoints: Vec<Endpoint>,
    active: usize,
}

impl EndpointSet {
    /// Build the set; an empty list is rejected here rather than discovered
    /// later by a selection that can never succeed.
    pub fn new(endpoints: Vec<Endpoint>) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(TransportError::NoEndpoints);
        }
        Ok(Self { endpoints, active: 0 })
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.iter()
    }

    /// Index of the endpoint currently in use
    pub fn active_index(&self) -> usize {
        self.active
    }

    /// The endpoint currently in use
    pub fn active(&self) -> &Endpoint {
        // `active` only ever holds an index produced by `select` on a non-empty set
        &self.endpoints[self.active]
    }

    /// Flag the active endpoint as failed
    pub fn mark_active_errored(&mut self) {
        if let Some(endpoint) = self.endpoints.get_mut(self.active) {
            endpoint.status = EndpointStatus::Errored;
        }
    }

    /// Make every endpoint eligible again
    pub fn reset(&mut self) {
        for endpoint in &mut self.endpoints {
            endpoint.status = EndpointStatus::Ready;
        }
    }

    /// Choose the next endpoint to use and make it the active one
    ///
    /// Only ready endpoints carrying the highest weight are candidates; one
    /// of them is picked uniformly at random. When every endpoint is errored
    /// the set is reset first, which always leaves at least one candidate.
    pub fn select<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        if !self.endpoints.iter().any(Endpoint::is_ready) {
            debug!(endpoints = self.endpoints.len(), "all endpoints failed, resetting status");
            self.reset();
        }

        let max_weight = self
            .endpoints
            .iter()
            .filter(|e| e.is_ready())
            .map(|e| e.weight)
            .fold(f64::NEG_INFINITY, f64::max);

        let candidates: Vec<usize> = self
            .endpoints
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_ready() && e.weight == max_weight)
            .map(|(idx, _)| idx)
            .collect();

        if let Some(&idx) = candidates.choose(rng) {
            self.active = idx;
        }

        debug!(
            url = self.active().socket.url(),
            weight = self.active().weight,
            candidates = candidates.len(),
            "selected endpoint"
        );

        self.active
    }
}
