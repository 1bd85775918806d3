// SPDX-License-Identifier: MPL-2.0

//! Integration tests for capability resolution and stage graph assembly

use camera_sender::constants::BitratePreset;
use camera_sender::gpu::{StaticProbe, VendorClass, VendorSelection, parse_lspci};
use camera_sender::media::encoders::EncoderSettings;
use camera_sender::media::{AccelerationFamily, Role, RoleCapabilitySet, RoleResolver};
use camera_sender::pipelines::topology::{CORE_ELEMENTS, StageKind};
use camera_sender::pipelines::{TopologyBuilder, TopologySettings, Variant};
use camera_sender::{Config, PipelineError};

fn software_probe() -> StaticProbe {
    StaticProbe::new(
        CORE_ELEMENTS
            .iter()
            .copied()
            .chain(["jpegdec", "x264enc", "h264parse", "autovideosink"]),
    )
}

fn settings() -> TopologySettings {
    TopologySettings::from(&Config::default())
}

/// Every hardware candidate name in the standard set
fn accelerated_names() -> Vec<String> {
    let set = RoleCapabilitySet::standard();
    set.families()
        .iter()
        .flat_map(|f| {
            Role::ALL
                .into_iter()
                .flat_map(move |role| f.candidates(role).iter().map(|id| id.to_string()))
        })
        .collect()
}

#[test]
fn test_nvidia_host_classified() {
    let listing = "\
00:1f.0 ISA bridge [0601]: Intel Corporation Device [8086:a30d]
01:00.0 VGA compatible controller [0300]: NVIDIA Corporation TU106 [GeForce RTX 2060] [10de:1f08] (rev a1)
01:00.1 Audio device [0403]: NVIDIA Corporation TU106 High Definition Audio Controller [10de:10f9]
";
    let vendors = parse_lspci(listing);
    assert_eq!(vendors, vec![VendorClass::Nvidia]);
    assert_eq!(VendorSelection::LastMatch.reduce(&vendors), VendorClass::Nvidia);
}

#[test]
fn test_no_acceleration_yields_software_graph() {
    let probe = software_probe();
    let accelerated = accelerated_names();

    for vendor in [
        VendorClass::Unknown,
        VendorClass::IntelIntegrated,
        VendorClass::Nvidia,
        VendorClass::Amd,
    ] {
        let resolver = RoleResolver::new(&probe);
        for role in Role::ALL {
            assert_eq!(resolver.resolve(role, vendor), None);
        }

        let resolved = resolver.resolve_all(vendor);
        let graph = TopologyBuilder::new(&probe, settings())
            .build(&resolved, Variant::Streaming)
            .unwrap();

        assert!(graph.is_software_only());
        for stage in graph.stages() {
            assert!(
                !accelerated.contains(&stage.factory.to_string()),
                "{} is accelerated",
                stage.factory
            );
        }
    }
}

#[test]
fn test_intel_with_vaapi_never_picks_generic_decoder() {
    let mut probe = software_probe();
    for name in ["vaapidecodebin", "vaapih264enc", "vaapipostproc", "vaapisink"] {
        probe.insert(name);
    }

    let resolved = RoleResolver::new(&probe).resolve_all(VendorClass::IntelIntegrated);
    let graph = TopologyBuilder::new(&probe, settings())
        .build(&resolved, Variant::Streaming)
        .unwrap();

    let decoder = graph.find_kind(StageKind::Decode).unwrap();
    assert_eq!(decoder.factory.as_str(), "vaapidecodebin");
    assert_eq!(decoder.family, AccelerationFamily::Vaapi);

    let post = graph.find_kind(StageKind::PostProcess).unwrap();
    let main_kinds: Vec<StageKind> = graph.main.iter().map(|s| s.kind).collect();
    assert_eq!(
        main_kinds,
        vec![
            StageKind::Source,
            StageKind::CapsFilter,
            StageKind::Decode,
            StageKind::PostProcess
        ]
    );
    assert_eq!(post.factory.as_str(), "vaapipostproc");
}

#[test]
fn test_preview_and_streaming_share_main_path() {
    let probe = software_probe();
    let resolved = RoleResolver::new(&probe).resolve_all(VendorClass::Unknown);
    let builder = TopologyBuilder::new(&probe, settings());

    let preview = builder.build(&resolved, Variant::Preview).unwrap();
    let streaming = builder.build(&resolved, Variant::Streaming).unwrap();

    assert_eq!(preview.main[..3], streaming.main[..]);
    let branch = streaming.branch.as_ref().unwrap();
    assert_eq!(branch.display.len(), 2);
    assert_eq!(branch.encode.last().unwrap().kind, StageKind::HandOff);
}

#[test]
fn test_missing_camera_source_is_fatal() {
    let probe = StaticProbe::new(["capsfilter", "tee", "queue", "appsink", "jpegdec"]);
    let resolved = RoleResolver::new(&probe).resolve_all(VendorClass::Unknown);
    let err = TopologyBuilder::new(&probe, settings())
        .build(&resolved, Variant::Preview)
        .unwrap_err();

    match err {
        PipelineError::StageInstantiationFailed { stage, factory, .. } => {
            assert_eq!(stage, "src");
            assert_eq!(factory, "v4l2src");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_encoder_follows_bitrate_preset() {
    let probe = software_probe();
    let resolved = RoleResolver::new(&probe).resolve_all(VendorClass::Unknown);
    let mut settings = settings();
    settings.encoder = EncoderSettings {
        preset: BitratePreset::High,
        width: 1920,
        framerate: 60,
    };

    let graph = TopologyBuilder::new(&probe, settings)
        .build(&resolved, Variant::Streaming)
        .unwrap();
    let encoder = graph.find("enc").unwrap();
    assert_eq!(encoder.property("bitrate"), Some("16000"));
    assert_eq!(encoder.property("key-int-max"), Some("60"));
}
