//! Version negotiation against a scripted in-memory transport.
//!
//! The transport answers each candidate with whatever the script returns and
//! records the candidates it was asked for.

use std::sync::Mutex;

use async_trait::async_trait;
use futures::future::join_all;

use test_utils::fixtures::{self, FeatureTypeFixture};
use wfs_client::{
    parse_capabilities, CapabilitiesTransport, ClientConfig, ConfigError, NegotiationError,
    Negotiator, ProtocolVersion, TransportError, VersionRegistry, WfsClient, WfsError,
};
use wfs_protocol::CapabilitiesDocument;

type Script = dyn Fn(ProtocolVersion) -> Result<String, TransportError> + Send + Sync;

struct ScriptedTransport {
    script: Box<Script>,
    requested: Mutex<Vec<ProtocolVersion>>,
}

impl ScriptedTransport {
    fn new<F>(script: F) -> Self
    where
        F: Fn(ProtocolVersion) -> Result<String, TransportError> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Server that always declares `version`.
    fn answering(version: &str) -> Self {
        let xml = fixtures::capabilities_xml(version, &[]);
        Self::new(move |_| Ok(xml.clone()))
    }

    fn requested(&self) -> Vec<ProtocolVersion> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl CapabilitiesTransport for ScriptedTransport {
    async fn fetch_capabilities(
        &self,
        version: ProtocolVersion,
    ) -> Result<CapabilitiesDocument, TransportError> {
        self.requested.lock().unwrap().push(version);
        let body = (self.script)(version)?;
        parse_capabilities("http://scripted/wfs", &body)
    }
}

fn v(s: &str) -> ProtocolVersion {
    s.parse().unwrap()
}

fn config() -> ClientConfig {
    ClientConfig::new("http://scripted/wfs")
}

// ============================================================================
// Single-step outcomes
// ============================================================================

#[tokio::test]
async fn test_matching_version_settles_without_retry() {
    let registry = VersionRegistry::supported();
    for version in registry.versions() {
        let transport = ScriptedTransport::answering(&version.to_string());
        let negotiation = Negotiator::new(&transport, &registry)
            .negotiate(*version)
            .await
            .unwrap();

        assert_eq!(negotiation.version, *version);
        assert_eq!(negotiation.attempts, 1);
        assert_eq!(transport.requested(), vec![*version]);
    }
}

#[tokio::test]
async fn test_server_floor_above_candidate_fails() {
    let registries = [
        VersionRegistry::supported(),
        VersionRegistry::new([v("1.0.0")]),
        VersionRegistry::new([v("0.5.0"), v("1.0.0"), v("1.1.0"), v("3.0.0")]),
    ];

    for registry in &registries {
        let transport = ScriptedTransport::answering("1.1.0");
        let err = Negotiator::new(&transport, registry)
            .negotiate(ProtocolVersion::V1_0_0)
            .await
            .unwrap_err();

        match err {
            WfsError::Negotiation(NegotiationError::BelowServerFloor { candidate, server }) => {
                assert_eq!(candidate, ProtocolVersion::V1_0_0);
                assert_eq!(server, ProtocolVersion::V1_1_0);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(transport.requested().len(), 1);
    }
}

#[tokio::test]
async fn test_lower_registered_version_settles_directly() {
    let registry = VersionRegistry::supported();
    let transport = ScriptedTransport::answering("1.1.0");

    let negotiation = Negotiator::new(&transport, &registry)
        .negotiate_highest()
        .await
        .unwrap();

    assert_eq!(negotiation.version, ProtocolVersion::V1_1_0);
    assert_eq!(transport.requested(), vec![ProtocolVersion::V2_0_0]);
}

#[tokio::test]
async fn test_lower_unregistered_version_falls_back() {
    let registry = VersionRegistry::supported();
    // Server speaks 1.5.0 natively but also answers 1.1.0 when asked for it
    let transport = ScriptedTransport::new(|requested| {
        let answer = if requested >= v("1.5.0") { "1.5.0" } else { "1.1.0" };
        Ok(fixtures::capabilities_xml(answer, &[]))
    });

    let negotiation = Negotiator::new(&transport, &registry)
        .negotiate_highest()
        .await
        .unwrap();

    assert_eq!(negotiation.version, ProtocolVersion::V1_1_0);
    assert_eq!(negotiation.attempts, 2);
    assert_eq!(
        transport.requested(),
        vec![ProtocolVersion::V2_0_0, ProtocolVersion::V1_1_0]
    );
}

#[tokio::test]
async fn test_no_older_version_fails_with_exhaustion() {
    let registry = VersionRegistry::supported();
    let transport = ScriptedTransport::answering("0.9.0");

    let err = Negotiator::new(&transport, &registry)
        .negotiate_highest()
        .await
        .unwrap_err();

    match err {
        WfsError::Negotiation(NegotiationError::NoCompatibleVersion { candidate, server }) => {
            assert_eq!(candidate, ProtocolVersion::V2_0_0);
            assert_eq!(server, v("0.9.0"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_multi_step_fallback_chain() {
    let registry = VersionRegistry::new([v("1.0.0"), v("1.1.0"), v("1.3.0"), v("2.0.0")]);
    let transport = ScriptedTransport::new(|requested| {
        let requested = requested.to_string();
        let answer = match requested.as_str() {
            "2.0.0" => "1.2.0",
            "1.1.0" => "1.0.5",
            other => other,
        };
        Ok(fixtures::capabilities_xml(answer, &[]))
    });

    let negotiation = Negotiator::new(&transport, &registry)
        .negotiate_highest()
        .await
        .unwrap();

    assert_eq!(negotiation.version, ProtocolVersion::V1_0_0);
    assert_eq!(negotiation.attempts, 3);
    assert_eq!(
        transport.requested(),
        vec![v("2.0.0"), v("1.1.0"), v("1.0.0")]
    );
}

#[tokio::test]
async fn test_prerelease_server_version_falls_back() {
    let registry = VersionRegistry::supported();
    let transport = ScriptedTransport::new(|requested| {
        let answer = if requested == ProtocolVersion::V2_0_0 {
            "2.0.0-rc.1"
        } else {
            "1.1.0"
        };
        Ok(fixtures::capabilities_xml(answer, &[]))
    });

    let negotiation = Negotiator::new(&transport, &registry)
        .negotiate_highest()
        .await
        .unwrap();

    assert_eq!(negotiation.version, ProtocolVersion::V1_1_0);
    assert_eq!(negotiation.attempts, 2);
    assert_eq!(
        transport.requested(),
        vec![ProtocolVersion::V2_0_0, ProtocolVersion::V1_1_0]
    );
}

#[tokio::test]
async fn test_prerelease_above_candidate_is_server_floor() {
    let registry = VersionRegistry::supported();
    let transport = ScriptedTransport::answering("1.1.0-beta.2");

    let err = Negotiator::new(&transport, &registry)
        .negotiate(ProtocolVersion::V1_0_0)
        .await
        .unwrap_err();

    match err {
        WfsError::Negotiation(NegotiationError::BelowServerFloor { candidate, server }) => {
            assert_eq!(candidate, ProtocolVersion::V1_0_0);
            assert_eq!(server.to_string(), "1.1.0-beta.2");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_registry_fails() {
    let registry = VersionRegistry::new([]);
    let transport = ScriptedTransport::answering("1.0.0");

    let err = Negotiator::new(&transport, &registry)
        .negotiate_highest()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        WfsError::Negotiation(NegotiationError::EmptyRegistry)
    ));
    assert!(transport.requested().is_empty());
}

// ============================================================================
// Termination
// ============================================================================

/// Answers every candidate with an unregistered version just above the next
/// lower registry entry, forcing the longest possible fallback chain.
fn adversarial(registry: VersionRegistry) -> ScriptedTransport {
    ScriptedTransport::new(move |requested| {
        let answer = match registry.greatest_below(&requested) {
            Some(below) => ProtocolVersion::new(below.major, below.minor, below.patch + 1),
            None => ProtocolVersion::new(0, 0, 0),
        };
        Ok(fixtures::capabilities_xml(&answer.to_string(), &[]))
    })
}

#[tokio::test]
async fn test_negotiation_steps_bounded_by_registry_size() {
    for size in 1..=8u32 {
        let registry = VersionRegistry::new((1..=size).map(|major| ProtocolVersion::new(major, 0, 0)));
        let transport = adversarial(registry.clone());

        let result = Negotiator::new(&transport, &registry)
            .negotiate_highest()
            .await;

        assert!(matches!(
            result,
            Err(WfsError::Negotiation(NegotiationError::NoCompatibleVersion { .. }))
        ));
        let requested = transport.requested();
        assert!(requested.len() <= registry.len() + 1);
        assert!(requested.windows(2).all(|w| w[1] < w[0]), "candidates must decrease");
    }
}

// ============================================================================
// Failure propagation
// ============================================================================

#[tokio::test]
async fn test_unreadable_version() {
    let registry = VersionRegistry::supported();

    let missing = ScriptedTransport::new(|_| Ok(fixtures::capabilities_without_version(&[])));
    let err = Negotiator::new(&missing, &registry)
        .negotiate_highest()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WfsError::Negotiation(NegotiationError::VersionUnreadable { found: None, .. })
    ));

    let malformed = ScriptedTransport::answering("1.1");
    let err = Negotiator::new(&malformed, &registry)
        .negotiate_highest()
        .await
        .unwrap_err();
    match err {
        WfsError::Negotiation(NegotiationError::VersionUnreadable { candidate, found }) => {
            assert_eq!(candidate, ProtocolVersion::V2_0_0);
            assert_eq!(found.as_deref(), Some("1.1"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_transport_errors_are_not_retried_with_other_versions() {
    let registry = VersionRegistry::supported();

    let failing = ScriptedTransport::new(|_| {
        Err(TransportError::Request {
            url: "http://scripted/wfs".to_string(),
            message: "connection refused".to_string(),
        })
    });
    let err = Negotiator::new(&failing, &registry)
        .negotiate_highest()
        .await
        .unwrap_err();
    assert!(matches!(err, WfsError::Transport(TransportError::Request { .. })));
    assert_eq!(failing.requested().len(), 1);

    let empty = ScriptedTransport::new(|_| Ok(String::new()));
    let err = Negotiator::new(&empty, &registry)
        .negotiate_highest()
        .await
        .unwrap_err();
    assert!(matches!(err, WfsError::Transport(TransportError::EmptyBody { .. })));

    let garbage = ScriptedTransport::new(|_| Ok("<html><p>Not found</html>".to_string()));
    let err = Negotiator::new(&garbage, &registry)
        .negotiate_highest()
        .await
        .unwrap_err();
    assert!(matches!(err, WfsError::Transport(TransportError::InvalidXml(_))));
}

// ============================================================================
// Client behaviour
// ============================================================================

#[tokio::test]
async fn test_explicit_version_bypasses_negotiation() {
    // The server would push negotiation to fail; the explicit version wins
    let transport = ScriptedTransport::answering("2.0.0");
    let client =
        WfsClient::with_transport(config().version(ProtocolVersion::V1_1_0), transport).unwrap();

    let negotiation = client.capabilities().await.unwrap();
    assert_eq!(negotiation.version, ProtocolVersion::V1_1_0);
    assert_eq!(negotiation.attempts, 1);
    assert_eq!(client.transport().requested(), vec![ProtocolVersion::V1_1_0]);
}

#[tokio::test]
async fn test_unsupported_explicit_version_fails_before_any_request() {
    let transport = std::sync::Arc::new(ScriptedTransport::answering("1.1.0"));
    let result = WfsClient::with_transport(config().version(v("1.2.0")), transport.clone());

    assert!(matches!(
        result,
        Err(WfsError::Config(ConfigError::UnsupportedVersion { .. }))
    ));
    assert!(transport.requested().is_empty());
}

#[tokio::test]
async fn test_feature_types_after_negotiation() {
    let transport = ScriptedTransport::new(|requested| {
        let types = [
            FeatureTypeFixture::new("ns:Roads").title("Road Network"),
            FeatureTypeFixture::new("Parcels"),
        ];
        let answer = if requested == ProtocolVersion::V2_0_0 { "2.0.0" } else { "1.1.0" };
        Ok(fixtures::capabilities_xml(answer, &types))
    });
    let client = WfsClient::with_transport(config(), transport).unwrap();

    let feature_types = client.feature_types().await.unwrap();
    assert_eq!(feature_types.len(), 2);
    assert_eq!(feature_types[0].name.as_deref(), Some("Roads"));
    assert_eq!(feature_types[0].namespace.as_deref(), Some("ns"));
    assert_eq!(feature_types[0].title.as_deref(), Some("Road Network"));
    assert_eq!(feature_types[0].abstract_text, None);
    assert_eq!(feature_types[1].name.as_deref(), Some("Parcels"));
    assert_eq!(feature_types[1].namespace, None);
}

#[tokio::test]
async fn test_feature_types_empty_when_list_missing() {
    let transport =
        ScriptedTransport::new(|_| Ok(fixtures::CAPABILITIES_WITHOUT_FEATURE_TYPES.to_string()));
    let client =
        WfsClient::with_transport(config().version(ProtocolVersion::V1_1_0), transport).unwrap();

    assert!(client.feature_types().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_negotiations_are_independent() {
    let transport = ScriptedTransport::new(|requested| {
        let answer = if requested >= ProtocolVersion::V1_1_0 { "1.1.0" } else { "1.0.0" };
        Ok(fixtures::capabilities_xml(answer, &[]))
    });
    let client = WfsClient::with_transport(config(), transport).unwrap();

    let results = join_all((0..8).map(|_| {
        let client = client.clone();
        async move { client.version().await }
    }))
    .await;

    for result in results {
        assert_eq!(result.unwrap(), ProtocolVersion::V1_1_0);
    }
    assert_eq!(client.transport().requested().len(), 8);
}
