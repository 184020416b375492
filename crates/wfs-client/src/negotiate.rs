//! Protocol version negotiation.
//!
//! The client offers a candidate version and reads the version the server
//! declares on the capabilities root:
//! - equal: settled
//! - higher: the server's floor is above the candidate, negotiation fails
//! - lower and known to the client: settled on the server's version
//! - lower and unknown: retry with the greatest client version below it
//!
//! The declared version may be any semantic version. A pre-release such as
//! `2.0.0-rc.1` sorts below `2.0.0` and is never a registry member, so it
//! falls back to the greatest client version below its release.
//!
//! Every retry strictly lowers the candidate inside a finite registry, so a
//! negotiation issues at most `registry.len() + 1` requests.

use std::cmp::Ordering;

use metrics::counter;
use tracing::{debug, info, instrument, warn};

use wfs_common::{
    DeclaredVersion, FeatureTypeDescriptor, NegotiationError, ProtocolVersion, VersionRegistry,
    WfsError, WfsResult,
};
use wfs_protocol::{extract_feature_types, CapabilitiesDocument, Namespaces};

use crate::transport::CapabilitiesTransport;

/// Outcome of comparing the server's declared version with the candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Both sides agree on this version.
    Settled(ProtocolVersion),
    /// Ask again with this (lower) candidate.
    Retry(ProtocolVersion),
    /// No agreement possible.
    Failed(NegotiationErrorKind),
}

/// Why a negotiation step failed. The versions involved are attached when the
/// step is turned into a [`NegotiationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationErrorKind {
    BelowServerFloor,
    NoCompatibleVersion,
}

/// Decide the next negotiation step.
pub fn decide(
    registry: &VersionRegistry,
    candidate: ProtocolVersion,
    server: &DeclaredVersion,
) -> Step {
    match server.cmp_release(&candidate) {
        Ordering::Equal => Step::Settled(candidate),
        Ordering::Greater => Step::Failed(NegotiationErrorKind::BelowServerFloor),
        Ordering::Less => match server.as_release() {
            Some(release) if registry.contains(&release) => Step::Settled(release),
            // Registry entries below a pre-release are those below its release
            _ => match registry.greatest_below(&server.release()) {
                Some(next) => Step::Retry(next),
                None => Step::Failed(NegotiationErrorKind::NoCompatibleVersion),
            },
        },
    }
}

/// A settled version and the capabilities document that settled it.
#[derive(Debug, Clone)]
pub struct Negotiation {
    pub version: ProtocolVersion,
    pub capabilities: CapabilitiesDocument,
    /// Number of capabilities requests issued
    pub attempts: usize,
}

impl Negotiation {
    /// Feature types listed in the capabilities document.
    pub fn feature_types(&self) -> Vec<FeatureTypeDescriptor> {
        let ns = Namespaces::for_document(&self.capabilities);
        extract_feature_types(&self.capabilities, &ns)
    }
}

/// Drives a transport until a version is settled.
pub struct Negotiator<'a, T: ?Sized> {
    transport: &'a T,
    registry: &'a VersionRegistry,
}

impl<'a, T: CapabilitiesTransport + ?Sized> Negotiator<'a, T> {
    pub fn new(transport: &'a T, registry: &'a VersionRegistry) -> Self {
        Self {
            transport,
            registry,
        }
    }

    /// Negotiate starting from the highest version in the registry.
    pub async fn negotiate_highest(&self) -> WfsResult<Negotiation> {
        let candidate = self
            .registry
            .highest()
            .ok_or(NegotiationError::EmptyRegistry)?;
        self.negotiate(candidate).await
    }

    /// Negotiate starting from `candidate`.
    ///
    /// Transport failures end the negotiation as they are; they are never
    /// retried with another version.
    #[instrument(skip(self), fields(registry = %self.registry.display_list()))]
    pub async fn negotiate(&self, candidate: ProtocolVersion) -> WfsResult<Negotiation> {
        let mut candidate = candidate;
        let mut attempts = 0;

        loop {
            attempts += 1;
            counter!("wfs_negotiation_attempts_total").increment(1);
            debug!(candidate = %candidate, attempt = attempts, "Trying protocol version");

            let capabilities = match self.transport.fetch_capabilities(candidate).await {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(candidate = %candidate, error = %e, "Capabilities request failed");
                    return Err(self.failed(e.into()));
                }
            };

            let Some(server) = capabilities.declared_version() else {
                let found = capabilities.version_attribute().map(str::to_string);
                warn!(candidate = %candidate, found = ?found, "Unable to read version in capabilities");
                return Err(self.failed(
                    NegotiationError::VersionUnreadable { candidate, found }.into(),
                ));
            };
            debug!(candidate = %candidate, server = %server, "Server responded with version");

            match decide(self.registry, candidate, &server) {
                Step::Settled(version) => {
                    info!(version = %version, attempts = attempts, "Protocol version settled");
                    return Ok(Negotiation {
                        version,
                        capabilities,
                        attempts,
                    });
                }
                Step::Retry(next) => {
                    debug!(
                        server = %server,
                        next = %next,
                        "Server version unknown to client, falling back to nearest lower version"
                    );
                    candidate = next;
                }
                Step::Failed(NegotiationErrorKind::BelowServerFloor) => {
                    warn!(candidate = %candidate, server = %server, "Candidate is below the server's lowest version");
                    return Err(self.failed(
                        NegotiationError::BelowServerFloor { candidate, server }.into(),
                    ));
                }
                Step::Failed(NegotiationErrorKind::NoCompatibleVersion) => {
                    warn!(candidate = %candidate, server = %server, "No compatible version left in registry");
                    return Err(self.failed(
                        NegotiationError::NoCompatibleVersion { candidate, server }.into(),
                    ));
                }
            }
        }
    }

    fn failed(&self, err: WfsError) -> WfsError {
        counter!("wfs_negotiation_failures_total", "kind" => err.kind()).increment(1);
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> ProtocolVersion {
        s.parse().unwrap()
    }

    fn d(s: &str) -> DeclaredVersion {
        s.parse().unwrap()
    }

    #[test]
    fn test_equal_versions_settle() {
        let registry = VersionRegistry::supported();
        for version in registry.versions() {
            let declared = DeclaredVersion::from(*version);
            assert_eq!(decide(&registry, *version, &declared), Step::Settled(*version));
        }
        // Also when the candidate is outside the registry
        assert_eq!(decide(&registry, v("3.1.0"), &d("3.1.0")), Step::Settled(v("3.1.0")));
        // Build metadata does not affect precedence
        assert_eq!(
            decide(&registry, ProtocolVersion::V2_0_0, &d("2.0.0+geoserver.2.24")),
            Step::Settled(ProtocolVersion::V2_0_0)
        );
    }

    #[test]
    fn test_server_above_candidate_fails_for_any_registry() {
        let registries = [
            VersionRegistry::supported(),
            VersionRegistry::new([]),
            VersionRegistry::new([v("1.0.0"), v("5.0.0")]),
        ];
        for registry in &registries {
            assert_eq!(
                decide(registry, v("1.0.0"), &d("1.1.0")),
                Step::Failed(NegotiationErrorKind::BelowServerFloor)
            );
            assert_eq!(
                decide(registry, v("1.0.0"), &d("1.1.0-beta")),
                Step::Failed(NegotiationErrorKind::BelowServerFloor)
            );
        }
    }

    #[test]
    fn test_lower_known_version_settles() {
        let registry = VersionRegistry::supported();
        assert_eq!(
            decide(&registry, ProtocolVersion::V2_0_0, &d("1.1.0")),
            Step::Settled(ProtocolVersion::V1_1_0)
        );
    }

    #[test]
    fn test_lower_unknown_version_falls_back() {
        let registry = VersionRegistry::supported();
        assert_eq!(
            decide(&registry, ProtocolVersion::V2_0_0, &d("1.5.0")),
            Step::Retry(ProtocolVersion::V1_1_0)
        );
        assert_eq!(
            decide(&registry, ProtocolVersion::V2_0_0, &d("0.9.0")),
            Step::Failed(NegotiationErrorKind::NoCompatibleVersion)
        );
    }

    #[test]
    fn test_prerelease_sorts_below_its_release() {
        let registry = VersionRegistry::supported();
        assert_eq!(
            decide(&registry, ProtocolVersion::V2_0_0, &d("2.0.0-rc.1")),
            Step::Retry(ProtocolVersion::V1_1_0)
        );
        // A pre-release of a registered version is not that version
        assert_eq!(
            decide(&registry, ProtocolVersion::V2_0_0, &d("1.1.0-beta")),
            Step::Retry(ProtocolVersion::V1_0_0)
        );
        assert_eq!(
            decide(&registry, ProtocolVersion::V1_0_0, &d("1.0.0-alpha")),
            Step::Failed(NegotiationErrorKind::NoCompatibleVersion)
        );
    }

    #[test]
    fn test_retry_candidate_always_lower() {
        let registry = VersionRegistry::new([v("1.0.0"), v("1.1.0"), v("1.3.0"), v("2.0.0")]);
        for candidate in registry.versions() {
            for server in ["0.1.0", "1.0.5", "1.2.0", "1.3.0-rc.2", "1.9.9", "2.0.0-beta"] {
                let server = d(server);
                if let Step::Retry(next) = decide(&registry, *candidate, &server) {
                    assert!(next < *candidate);
                    assert_eq!(server.cmp_release(&next), std::cmp::Ordering::Greater);
                }
            }
        }
    }
}
