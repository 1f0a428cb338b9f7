// End-to-end generation tests over the `device.json` fixture.
//
// Uses the library API (schema → insertions → four passes) without writing
// files and checks the observable contract of each artifact.

use std::path::{Path, PathBuf};

use cxxstub::config::GeneratorConfig;
use cxxstub::identity::{IdentityComposer, Sha256Digest};
use cxxstub::model::{StorageKind, TypeModel};
use cxxstub::pass::Artifact;
use cxxstub::pipeline::{self, RunOutput};
use cxxstub::schema;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn config(opts: &[&str]) -> GeneratorConfig {
    let mut config = GeneratorConfig::new(fixture("device.json"));
    config.apply_backend_option("macro=BSE_DEVICE");
    for opt in opts {
        assert!(config.apply_backend_option(opt), "unknown option {}", opt);
    }
    config
}

fn generate(config: &GeneratorConfig) -> RunOutput {
    pipeline::generate(config, &[fixture("device.ins")]).expect("generation failed")
}

fn text(out: &RunOutput, artifact: Artifact) -> &str {
    out.artifacts
        .iter()
        .find(|a| a.artifact == artifact)
        .map(|a| a.text.as_str())
        .unwrap()
}

// ── Servant side ────────────────────────────────────────────────────────────

#[test]
fn servant_header_declares_interfaces() {
    let out = generate(&config(&[]));
    let hh = text(&out, Artifact::ServerDecl);
    assert!(hh.starts_with("// --- Generated by cxxstub ---\n#ifndef __SRVT__BSE_DEVICE\n#define __SRVT__BSE_DEVICE\n\n#ifndef DOXYGEN\n"));
    assert!(hh.contains("#define __BSE_DEVICE_ifx__(interfacecodeextension)\tinterfacecodeextension\n"));
    assert!(hh.contains("#include \"device_handles.hh\"\n"));
    assert!(hh.contains("class ObjectIface : public virtual Aida::ImplicitBase\n"));
    assert!(hh.contains("class DeviceIface : public virtual ObjectIface\n"));
    // Object is already reachable through Device.
    assert!(hh.contains("class MixerIface : public virtual DeviceIface\n{"));
    assert!(hh.contains(&format!("  virtual {:<30}{} () const = 0;\n", "std::string", "name ")));
    assert!(hh.contains(&format!("  virtual {:<30}{} () const = 0;\n", "DeviceIfaceP", "peer ")));
    assert!(hh.contains(&format!("  virtual {:<30}{} (DeviceIface*) = 0;\n", "void", "peer ")));
    assert!(hh.contains("(double speed = 1.0) = 0;\n"));
    assert!(hh.contains("#define BSE_DEVICE_INTERFACE_LIST \\\n\t  BSE_DEVICE_INTERFACE_NAME (Bse::Object) \\\n\t  BSE_DEVICE_INTERFACE_NAME (Bse::Device) \\\n\t  BSE_DEVICE_INTERFACE_NAME (Bse::Audio::Mixer)\n"));
    assert!(hh.contains("\n#else // DOXYGEN\n"));
    assert!(hh.contains("/// @class Bse::Audio::MixerImpl\n/// @implements Bse::Audio::Mixer\n"));
    assert!(hh.trim_end().ends_with("#endif /* __SRVT__BSE_DEVICE */"));
}

#[test]
fn pointer_aliases_emitted_once() {
    let out = generate(&config(&[]));
    let hh = text(&out, Artifact::ServerDecl);
    assert_eq!(
        hh.matches("typedef std::shared_ptr<DeviceIface> DeviceIfaceP;\n")
            .count(),
        1
    );
    assert_eq!(
        hh.matches("typedef std::weak_ptr  <ObjectIface> ObjectIfaceW;\n")
            .count(),
        1
    );
}

#[test]
fn servant_insertions_are_spliced() {
    let out = generate(&config(&[]));
    let hh = text(&out, Artifact::ServerDecl);
    assert!(hh.contains("  // interface_scope:Device:\n  void reset_peer ();\n"));
    assert!(hh.contains("  // class_scope:Mixer:\n  static constexpr int CHANNELS = 2;\n"));
    assert!(!hh.contains("is_null"));
    assert!(hh.contains("// includes:\n#include <bse/device-extras.hh>\n"));
}

#[test]
fn servant_impl_has_access_and_dispatch() {
    let out = generate(&config(&[]));
    let cc = text(&out, Artifact::ServerImpl);
    assert!(cc.contains("#include \"device_interfaces.hh\"\n"));
    assert!(cc.contains("std::is_base_of<Aida::ImplicitBase, Aida::ImplicitBase>"));
    assert!(cc.contains("Aida::StringVector\nDeviceIface::__typelist_mt__ () const\n{\n  return { \"Bse.Device\", \"Bse.Object\", };\n}\n"));
    assert!(cc.contains("  if (this->DeviceIface::__access__ (__n, __p)) return true;\n"));
    assert!(cc.contains("  const char *const __aux__name =\n    \"type=STRING\\0\"\n    \"label=Name\\0\";\n"));
    assert!(cc.contains("static const Aida::DispatchRegistry __aida__dispatch__Bse_Device_ (\n  \"Bse.Device\", "));
    assert!(cc.contains("    { \"Bse.Object\", Aida::TypeHash ("));
    assert!(cc.contains("    { \"play\", Aida::DispatchRole::METHOD, "));
}

// ── Handle side ─────────────────────────────────────────────────────────────

#[test]
fn handle_header_declares_value_types_and_handles() {
    let out = generate(&config(&[]));
    let hh = text(&out, Artifact::ClientDecl);
    assert!(hh.contains("#ifndef __BSE_DEVICE_ifx__\n#define __BSE_DEVICE_ifx__(...) /**/\n#endif\n"));
    assert!(hh.contains("#include <aidacc/aida.hh>\n"));
    assert!(hh.contains("enum class Mode : int64_t {\n  NONE = 0,\n  LOOP = 1, // Repeat forever\n  HUGE = 18446744073709551615u,\n};\n"));
    assert!(hh.contains("AIDA_DEFINE_FLAGS_ARITHMETIC (Mode);\n"));
    assert!(hh.contains("\nclass DeviceHandle;\n"));
    assert!(hh.contains(&format!("  {:<30}x = 0;\n", "double")));
    assert!(hh.contains("class DeviceSeq : public std::vector<Aida::RemoteMember<DeviceHandle>>\n"));
    assert!(hh.contains("class DeviceHandle : public virtual ObjectHandle\n"));
    assert!(hh.contains("class ObjectHandle : public virtual Aida::RemoteHandle\n"));
    assert!(hh.contains(&format!("  {:<30}{} () const;\n", "std::string", "name ")));
    assert!(hh.contains(&format!("  {:<30}{} (Mode);\n", "void", "mode ")));
    assert!(hh.contains(&format!("  {:<30}__cast__ (const RemoteHandle &smh);\n", "static DeviceHandle")));
    assert!(hh.contains(&format!("  {:<30}DeviceHandle ();\n", "explicit")));
    assert!(hh.contains("  // handle_scope:Device:\n  bool is_null () const { return !__iface__(); }\n"));
    assert!(!hh.contains("reset_peer"));
    assert!(hh.contains("typedef ::Aida::ScopedHandle<DeviceH> DeviceS;\n"));
}

#[test]
fn handle_impl_registers_aux_data() {
    let out = generate(&config(&[]));
    let cc = text(&out, Artifact::ClientImpl);
    for entry in [
        "\"typename=Bse.Device\\0\"",
        "\"type=INTERFACE\\0\"",
        "\"blurb=An audio device\\0\"",
        "\"name.type=STRING\\0\"",
        "\"name.label=Name\\0\"",
        "\"score.type=INT32\\0\"",
        "\"peer.type=Bse.Device\\0\"",
        "\"blurb=Playback mode\\0\"",
        "\"HUGE.value=18446744073709551615\\0\"",
        "\"fields=x;y\\0\"",
        "\"fields=devices\\0\"",
    ] {
        assert!(cc.contains(entry), "missing {}", entry);
    }
    assert!(cc.contains("DeviceHandle\nDeviceHandle::__cast__ (const Aida::RemoteHandle &other)\n"));
    assert!(cc.contains("bool\nPoint::operator== (const Point &other) const\n{\n  if (this->x != other.x) return false;\n  if (this->y != other.y) return false;\n  return true;\n}\n"));
}

#[test]
fn handle_stubs_carry_member_identities() {
    let out = generate(&config(&[]));
    let cc = text(&out, Artifact::ClientImpl);
    let server = text(&out, Artifact::ServerImpl);
    let model: TypeModel = schema::load_file(&fixture("device.json")).unwrap().model;
    let device = model.lookup("Bse.Device").unwrap();
    let digest = Sha256Digest;
    let ids = IdentityComposer::new(&model, &digest);
    let locate = model
        .get(device)
        .methods()
        .iter()
        .find(|m| m.name == "locate")
        .unwrap();
    let id = ids.method_identity(device, locate).type_hash_expr();
    assert!(cc.contains(&format!(
        "  return __AIDA_Local__::remote_callr (*this, &DeviceIface::locate, {}, arg_hint, *arg_other.__iface__());\n",
        id
    )));
    assert!(server.contains(&format!("{{ \"locate\", Aida::DispatchRole::METHOD, {} }}", id)));

    let int = TypeModel::primitive(StorageKind::Int32).unwrap();
    let getter = ids.property_identity(device, "score", int, false).type_hash_expr();
    assert!(cc.contains(&format!(
        "  return __AIDA_Local__::remote_callc (*this, &DeviceIface::score, {});\n",
        getter
    )));
}

// ── Options and diagnostics ─────────────────────────────────────────────────

#[test]
fn docs_option_adds_cross_references() {
    let out = generate(&config(&["docs"]));
    let hh = text(&out, Artifact::ServerDecl);
    assert!(hh.contains("/** @interface Device\n * See also the corresponding C++ servant class DeviceIface. */\n"));
    assert!(hh.contains(" \t///< See Device::name\n"));
    let client = text(&out, Artifact::ClientImpl);
    assert!(client.contains(" /// See Device::play()\n"));
}

#[test]
fn property_list_off_removes_access() {
    let out = generate(&config(&["property-list=no"]));
    for artifact in [Artifact::ServerDecl, Artifact::ServerImpl] {
        assert!(!text(&out, artifact).contains("__access__"));
    }
    let out = generate(&config(&[]));
    assert!(text(&out, Artifact::ServerDecl).contains("__access__"));
}

#[test]
fn unknown_insertion_type_warns() {
    let out = generate(&config(&[]));
    let ghost: Vec<_> = out
        .diagnostics
        .iter()
        .filter(|d| d.message.contains("'Ghost'"))
        .collect();
    assert_eq!(ghost.len(), 1);
    let loc = ghost[0].location.as_ref().unwrap();
    assert_eq!(loc.line, Some(10));
}

#[test]
fn namespaces_are_balanced() {
    let out = generate(&config(&[]));
    for a in &out.artifacts {
        let opens =
            a.text.matches("\nnamespace Bse {\n").count() + a.text.matches("\nnamespace Audio {\n").count();
        let closes = a.text.matches("} // Bse\n").count() + a.text.matches("} // Audio\n").count();
        assert_eq!(opens, closes, "{}", a.artifact.name());
    }
}
