// codegen.rs — Dual-mode emission of servant and remote handle artifacts
//
// One traversal over the ordered implementation types drives all four
// artifacts. The active `Artifact` selects the generation mode (servant for
// `_interfaces.*`, handle for `_handles.*`) and which per-type generators
// run; everything that names a member on the wire goes through the
// `IdentityComposer`, so both sides agree on dispatch identities.
//
// Preconditions: the model is fully resolved (see `schema`), insertion keys
//                have been validated.
// Postconditions: returns the complete text of one artifact; namespace
//                 scopes opened during the pass are closed again.
// Failure modes: none (all inputs are validated upstream).
// Side effects: records emitted servant pointer aliases in `RunState`.

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::auxdata::{field_entries, render_block, type_entries};
use crate::config::GeneratorConfig;
use crate::id::TypeId;
use crate::identity::{IdentityComposer, SignatureDigest, WireId};
use crate::inherit::{bases, class_ancestry};
use crate::insertions::{Insertions, SlotKey, SlotKind};
use crate::model::{Field, Method, StorageKind, TypeKind, TypeModel};
use crate::names::{Formatter, GenMode};
use crate::pass::Artifact;
use crate::scope::NamespaceScope;
use crate::templates;

/// Tab stop used for member alignment in all artifacts.
pub const TAB_STOP: usize = 30;

const REMOTE_HANDLE: &str = "Aida::RemoteHandle";

// ── Public types ────────────────────────────────────────────────────────────

/// State shared by the passes of one run.
#[derive(Debug, Default)]
pub struct RunState {
    /// Type identifiers whose `XIfaceP`/`XIfaceW` aliases were emitted.
    declared_pointers: HashSet<String>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_pointer_decl(&self, type_identifier: &str) -> bool {
        self.declared_pointers.contains(type_identifier)
    }
}

/// Read-only inputs of a generation run.
#[derive(Clone, Copy)]
pub struct StubInputs<'a> {
    pub model: &'a TypeModel,
    pub config: &'a GeneratorConfig,
    pub insertions: &'a Insertions,
    pub digest: &'a dyn SignatureDigest,
}

// ── Public entry point ──────────────────────────────────────────────────────

/// Generate the text of one artifact.
pub fn generate(inputs: StubInputs<'_>, artifact: Artifact, state: &mut RunState) -> String {
    let mut ctx = EmitCtx::new(inputs, artifact, state);
    ctx.emit_all();
    ctx.out
}

// ── Internal context ────────────────────────────────────────────────────────

/// How a remote call treats its receiver and arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    /// Property getter: const receiver.
    Getter,
    /// Property setter: interface values may be null, so they are not
    /// dereferenced.
    Setter,
    /// Regular method: arguments carry the `arg_` prefix.
    Method,
}

struct EmitCtx<'a> {
    model: &'a TypeModel,
    config: &'a GeneratorConfig,
    insertions: &'a Insertions,
    ids: IdentityComposer<'a>,
    artifact: Artifact,
    mode: GenMode,
    scope: NamespaceScope,
    tab: usize,
    cppmacro: String,
    state: &'a mut RunState,
    out: String,
}

impl<'a> EmitCtx<'a> {
    fn new(inputs: StubInputs<'a>, artifact: Artifact, state: &'a mut RunState) -> Self {
        EmitCtx {
            model: inputs.model,
            config: inputs.config,
            insertions: inputs.insertions,
            ids: IdentityComposer::new(inputs.model, inputs.digest),
            artifact,
            mode: artifact.mode(),
            scope: NamespaceScope::new(),
            tab: crate::names::DEFAULT_TAB_STOP,
            cppmacro: inputs.config.cpp_macro(),
            state,
            out: String::with_capacity(16 * 1024),
        }
    }

    fn fmt(&self) -> Formatter<'_> {
        Formatter::new(self.model, &self.scope, self.mode).with_tab_stop(self.tab)
    }

    fn is(&self, artifact: Artifact) -> bool {
        self.artifact == artifact
    }

    fn storage(&self, ty: TypeId) -> StorageKind {
        self.model.get(ty).storage()
    }

    /// Move the open namespace scope to that of `ty` (or to the top level).
    fn enter(&mut self, ty: Option<TypeId>) {
        let chain = match ty {
            Some(ty) => self.model.get(ty).namespace.as_slice(),
            None => &[],
        };
        let text = self.scope.enter(self.model, chain);
        self.out.push_str(&text);
    }

    fn insertion(&self, kind: SlotKind, ty: TypeId) -> String {
        self.insertions
            .text(&SlotKey::scoped(kind, &self.model.get(ty).name))
    }

    // ── Top-level emit ──────────────────────────────────────────────────

    fn emit_all(&mut self) {
        let model = self.model;
        let types = model.impl_types();
        let guard = match self.mode {
            GenMode::Servant => "__SRVT__",
            GenMode::Handle => "__CLNT__",
        };
        self.out.push_str("// --- Generated by cxxstub ---\n");
        if self.artifact.is_decl() {
            let _ = write!(
                self.out,
                "#ifndef {g}{m}\n#define {g}{m}\n\n",
                g = guard,
                m = self.cppmacro
            );
        }
        if self.is(Artifact::ServerDecl) {
            self.out.push_str("#ifndef DOXYGEN\n");
        }
        self.emit_prologue(&types);
        self.tab = TAB_STOP;
        self.enter(None);

        if self.is(Artifact::ClientDecl) {
            for &tp in &types {
                let node = model.get(tp);
                if !node.is_forward && node.storage() == StorageKind::Enum {
                    self.enter(Some(tp));
                    let text = self.enum_decl(tp);
                    self.out.push_str(&text);
                }
            }
        }
        if self.artifact.is_decl() {
            self.emit_declarations(&types);
        } else {
            self.emit_implementations(&types);
        }
        self.enter(None);
        if self.is(Artifact::ServerDecl) {
            self.emit_doxygen_section(&types);
        }
        if self.artifact.is_decl() {
            let _ = writeln!(self.out, "\n#endif /* {}{} */", guard, self.cppmacro);
        }
    }

    fn emit_prologue(&mut self, types: &[TypeId]) {
        let model = self.model;
        let config = self.config;
        let m = self.cppmacro.clone();
        if self.is(Artifact::ClientDecl) {
            let _ = write!(
                self.out,
                "#ifndef __{m}_ifx__\n#define __{m}_ifx__(...) /**/\n#endif\n\n"
            );
        }
        if self.is(Artifact::ServerDecl) {
            // Servant classes are pre-declared for Handle <-> Iface conversions.
            for &tp in types {
                let node = model.get(tp);
                if !node.is_forward && node.storage() == StorageKind::Interface {
                    self.enter(Some(tp));
                    let class = self.fmt().class_name(tp);
                    let _ = writeln!(self.out, "class {};", class);
                }
            }
            self.enter(None);
            let _ = write!(
                self.out,
                "#define __{m}_ifx__(interfacecodeextension)\tinterfacecodeextension\n\n"
            );
            let _ = writeln!(
                self.out,
                "#include \"{}\"",
                config.output_file_name(Artifact::ClientDecl)
            );
        }
        if !self.artifact.is_decl() {
            let _ = writeln!(
                self.out,
                "#include \"{}\"",
                config.output_file_name(Artifact::ServerDecl)
            );
        }
        let inclusions = &config.inclusions;
        if !inclusions.is_empty() {
            self.out.push_str("\n// --- Custom Includes ---\n");
            if !self.artifact.is_decl() {
                self.out.push_str("#ifndef __AIDA_UTILITIES_HH__\n");
            }
            for inc in inclusions {
                let _ = writeln!(self.out, "#include {}", inc);
            }
            if !self.artifact.is_decl() {
                self.out.push_str("#endif\n");
            }
        }
        self.out.push_str(&self.insertions.text(&SlotKey::includes()));
        match self.artifact {
            Artifact::ClientDecl => self.out.push_str("#include <aidacc/aida.hh>\n"),
            Artifact::ServerImpl => {
                let text = templates::expand(templates::SERVER_CC, &config.iface_base);
                self.out.push_str(&text);
                self.out.push('\n');
            }
            Artifact::ClientImpl => {
                let text = templates::expand(templates::CLIENT_CC, &config.iface_base);
                self.out.push_str(&text);
                self.out.push('\n');
            }
            Artifact::ServerDecl => {}
        }
    }

    fn emit_declarations(&mut self, types: &[TypeId]) {
        let model = self.model;
        let mut class_names = Vec::new();
        for &tp in types {
            let node = model.get(tp);
            let storage = node.storage();
            if node.is_forward {
                self.enter(Some(tp));
                self.out.push('\n');
                let text = if storage == StorageKind::Interface && self.mode == GenMode::Servant {
                    self.pointer_decls(tp)
                } else {
                    format!("class {};\n", self.fmt().class_name(tp))
                };
                self.out.push_str(&text);
            } else if self.is(Artifact::ClientDecl)
                && matches!(storage, StorageKind::Record | StorageKind::Sequence)
            {
                self.enter(Some(tp));
                let text = self.recseq_decl(tp);
                self.out.push_str(&text);
            } else if storage == StorageKind::Interface {
                self.enter(Some(tp));
                let text = self.interface_class(tp, &mut class_names);
                self.out.push_str(&text);
            }
        }
        // Template bodies follow once every type is complete.
        if self.is(Artifact::ClientDecl) {
            for &tp in types {
                let node = model.get(tp);
                if !node.is_forward
                    && matches!(node.storage(), StorageKind::Record | StorageKind::Sequence)
                {
                    self.enter(Some(tp));
                    let text = self.recseq_visitors(tp);
                    self.out.push_str(&text);
                }
            }
        }
        self.enter(None);
        if self.is(Artifact::ServerDecl) && !class_names.is_empty() {
            let _ = write!(self.out, "\n#define {}_INTERFACE_LIST", self.cppmacro);
            for name in &class_names {
                let _ = write!(
                    self.out,
                    " \\\n\t  {}_INTERFACE_NAME ({})",
                    self.cppmacro, name
                );
            }
            self.out.push('\n');
        }
    }

    fn emit_implementations(&mut self, types: &[TypeId]) {
        let model = self.model;
        self.out.push_str("\n// --- Implementations ---\n");
        let client = self.is(Artifact::ClientImpl);
        for &tp in types {
            let node = model.get(tp);
            if node.is_forward {
                continue;
            }
            match node.storage() {
                StorageKind::Record if client => {
                    self.enter(Some(tp));
                    let text = self.record_impl(tp);
                    self.out.push_str(&text);
                }
                StorageKind::Sequence if client => {
                    self.enter(Some(tp));
                    let text = self.sequence_impl(tp);
                    self.out.push_str(&text);
                }
                StorageKind::Interface if client => {
                    self.enter(Some(tp));
                    let mut text = self.client_class_methods(tp);
                    text.push_str(&self.aux_registration(tp));
                    for field in node.fields() {
                        text.push_str(&self.client_property_stub(tp, field));
                    }
                    for method in node.methods() {
                        text.push_str(&self.client_method_stub(tp, method));
                    }
                    self.out.push_str(&text);
                }
                StorageKind::Interface => {
                    self.enter(Some(tp));
                    let mut text = self.server_class_methods(tp);
                    if self.config.property_list {
                        text.push_str(&self.server_access_impl(tp));
                    }
                    text.push_str(&self.dispatch_table(tp));
                    self.out.push_str(&text);
                }
                _ => {}
            }
        }
        if client {
            let enums: Vec<TypeId> = types
                .iter()
                .copied()
                .filter(|&tp| {
                    let node = model.get(tp);
                    !node.is_forward && node.storage() == StorageKind::Enum
                })
                .collect();
            if !enums.is_empty() {
                self.enter(None);
                self.out.push('\n');
            }
            for tp in enums {
                self.enter(Some(tp));
                let text = format!("\n{}", self.aux_registration(tp));
                self.out.push_str(&text);
            }
        }
    }

    fn emit_doxygen_section(&mut self, types: &[TypeId]) {
        let model = self.model;
        self.out.push_str("\n#else // DOXYGEN\n");
        for &tp in types {
            let node = model.get(tp);
            if node.is_forward || node.storage() != StorageKind::Interface {
                continue;
            }
            self.enter(Some(tp));
            let abs = model.absolute_name(tp);
            let class = self.fmt().class_name(tp);
            let _ = write!(
                self.out,
                "\n/// IDL interface class for {abs}\n/// @extends {abs}\nclass {class} {{}};\n\n\
                 /// @class {abs}Impl\n/// @implements {abs}\n"
            );
        }
        self.out.push('\n');
        self.enter(None);
        self.out.push_str("#endif // DOXYGEN\n");
    }

    // ── Enums ───────────────────────────────────────────────────────────

    fn enum_decl(&self, tp: TypeId) -> String {
        let node = self.model.get(tp);
        let TypeKind::Enum { values, combinable } = &node.kind else {
            return String::new();
        };
        let nm = &node.name;
        let mut s = String::from("\n/// @cond GeneratedEnums\n");
        let _ = writeln!(s, "enum class {} : int64_t {{", nm);
        for v in values {
            let _ = write!(s, "  {} = {},", v.ident, c_long_postfix(v.value));
            if let Some(blurb) = v.blurb.as_deref().filter(|b| !b.is_empty()) {
                let _ = write!(s, " // {}", blurb.replace('\n', " "));
            }
            s.push('\n');
        }
        s.push_str("};\n");
        let _ = writeln!(s, "AIDA_DEFINE_ENUM_EQUALITY ({});", nm);
        let _ = writeln!(
            s,
            "inline std::string to_string   ({} ev)                         {{ return Aida::enum_value_to_string (ev); }}",
            nm
        );
        let _ = writeln!(
            s,
            "inline bool        from_string (const std::string &en, {nm} &ev) {{ ev = Aida::enum_value_from_string<{nm}> (en); return true; }}"
        );
        if *combinable {
            let _ = writeln!(s, "AIDA_DEFINE_FLAGS_ARITHMETIC ({});", nm);
        }
        s.push_str("/// @endcond\n");
        s
    }

    // ── Records and sequences ───────────────────────────────────────────

    fn recseq_decl(&self, tp: TypeId) -> String {
        let f = self.fmt();
        let node = self.model.get(tp);
        let class = f.class_name(tp);
        let mut s = String::from("\n");
        match &node.kind {
            TypeKind::Sequence { element } => {
                let member = f.member_type(element.ty);
                let _ = write!(s, "class {} : public std::vector<{}>\n{{\npublic:\n", class, member);
                let _ = writeln!(s, "  typedef std::vector<{}> Sequence;", member);
                s.push_str("  reference append_back() ///< Append data at the end, returns write reference to data.\n");
                s.push_str("  { resize (size() + 1); return back(); }\n");
                let _ = writeln!(s, "  {}{} () = default;", f.pad("inline", 0), class);
                let _ = writeln!(s, "  {}{} (const Aida::AnySeq &s);", f.pad("inline", 0), class);
                let _ = writeln!(
                    s,
                    "  {}{} (std::initializer_list<value_type> il) : Sequence (il) {{}};",
                    f.pad("explicit", 0),
                    class
                );
            }
            TypeKind::Record { fields } => {
                let _ = write!(s, "class {}\n{{\npublic:\n", class);
                s.push_str("  /// @cond GeneratedFields\n");
                for field in fields {
                    let init = if self.storage(field.ty).is_scalar() {
                        format!(" = {}", f.zero_value(field.ty))
                    } else {
                        String::new()
                    };
                    let _ = writeln!(s, "  {}{}{};", f.pad(&f.member_type(field.ty), 0), field.name, init);
                }
                s.push_str("  /// @endcond\n");
                let _ = writeln!(s, "  {}{} () = default;", f.pad("inline", 0), class);
                let _ = writeln!(
                    s,
                    "  {}{} (const Aida::AnyRec &r) {{ __visit__ ([&r] (auto &v, const char *n) {{ \
                     v = r[n].get< typename std::decay<decltype (v)>::type >(); }}); }}",
                    f.pad("inline", 0),
                    class
                );
            }
            _ => return String::new(),
        }
        let _ = writeln!(
            s,
            "  {}__typename__      () const\t{{ return \"{}\"; }}",
            f.pad("std::string", 0),
            self.model.type_identifier(tp)
        );
        let _ = writeln!(s, "  {}__typedata__ ();", f.pad("static const Aida::StringVector&", 0));
        if let TypeKind::Sequence { element } = &node.kind {
            if self.storage(element.ty) != StorageKind::Any {
                let _ = writeln!(s, "  {}Aida::AnySeq      () const;", f.pad("inline operator", 0));
            }
        }
        if node.storage() == StorageKind::Record {
            let _ = writeln!(s, "  {}operator==   (const {} &other) const;", f.pad("bool", 0), class);
            let _ = writeln!(
                s,
                "  {}operator!=   (const {} &other) const {{ return !operator== (other); }}",
                f.pad("bool", 0),
                class
            );
            let _ = writeln!(
                s,
                "  {}Aida::AnyRec () const {{ Aida::AnyRec r; const_cast<{}*> (this)->__visit__ \
                 ([&r] (const auto &v, const char *n) {{ r[n] = v; }}); return r; }}",
                f.pad("operator", 0),
                class
            );
            let _ = writeln!(
                s,
                "  {}__visit__    (Visitor &&_visitor_);",
                f.pad("template<class Visitor> void", 0)
            );
        }
        s.push_str(&self.insertion(SlotKind::ClassScope, tp));
        s.push_str(&self.insertion(SlotKind::HandleScope, tp));
        s.push_str("};\n");
        s
    }

    fn recseq_visitors(&self, tp: TypeId) -> String {
        let class = self.fmt().class_name(tp);
        let mut s = String::new();
        match &self.model.get(tp).kind {
            TypeKind::Record { fields } => {
                let _ = write!(s, "template<class Visitor> void\n{}::__visit__ (Visitor &&_visitor_)\n{{\n", class);
                for field in fields {
                    let _ = writeln!(
                        s,
                        "  std::forward<Visitor> (_visitor_) ({}, \"{}\");",
                        field.name, field.name
                    );
                }
                s.push_str("}\n");
            }
            TypeKind::Sequence { element } => {
                let _ = write!(s, "inline\n{c}::{c} (const Aida::AnySeq &s)\n{{\n", c = class);
                s.push_str("  for (const auto &any : s)\n");
                let _ = writeln!(
                    s,
                    "    push_back (any.get< typename std::decay<{}::value_type>::type >());",
                    class
                );
                s.push_str("}\n");
                if self.storage(element.ty) != StorageKind::Any {
                    let _ = write!(s, "inline\n{}::operator Aida::AnySeq () const\n{{\n", class);
                    s.push_str("  Aida::AnySeq s;\n");
                    s.push_str("  for (const auto &v : *this)\n");
                    s.push_str("    s.push_back (Aida::Any (v));\n");
                    s.push_str("  return s;\n");
                    s.push_str("}\n");
                }
            }
            _ => {}
        }
        s
    }

    fn typedata_impl(&self, tp: TypeId) -> String {
        format!(
            "const Aida::StringVector&\n{}::__typedata__()\n{{\n  \
             static const Aida::StringVector &sv = Aida::Introspection::find_type (\"{}\");\n  \
             return sv;\n}}\n",
            self.fmt().class_name(tp),
            self.model.type_identifier(tp)
        )
    }

    fn record_impl(&self, tp: TypeId) -> String {
        let class = self.fmt().class_name(tp);
        let mut s = self.aux_registration(tp);
        s.push_str(&self.typedata_impl(tp));
        let _ = write!(s, "bool\n{c}::operator== (const {c} &other) const\n{{\n", c = class);
        for field in self.model.get(tp).fields() {
            let _ = writeln!(s, "  if (this->{n} != other.{n}) return false;", n = field.name);
        }
        s.push_str("  return true;\n}\n");
        s
    }

    fn sequence_impl(&self, tp: TypeId) -> String {
        let mut s = self.aux_registration(tp);
        s.push_str(&self.typedata_impl(tp));
        s
    }

    /// Introspection registry entry holding the aux metadata of `tp`.
    fn aux_registration(&self, tp: TypeId) -> String {
        let unique = self.model.absolute_name(tp).replace("::", "_");
        format!(
            "static const Aida::IntrospectionRegistry __aida__aux__data__{}_ = {{\n{}}};\n",
            unique,
            render_block(&type_entries(self.model, tp), "  ")
        )
    }

    // ── Interface declarations ──────────────────────────────────────────

    /// Reduced base class names plus the constructor-less root for classes
    /// without prerequisites.
    fn inheritance(&self, tp: TypeId) -> Vec<String> {
        let f = self.fmt();
        let names: Vec<String> = bases(self.model, tp)
            .into_iter()
            .map(|b| f.class_name(b))
            .collect();
        if !names.is_empty() {
            return names;
        }
        match self.mode {
            GenMode::Servant => vec![self.config.iface_base.clone()],
            GenMode::Handle => vec![REMOTE_HANDLE.to_string()],
        }
    }

    fn pointer_decls(&mut self, tp: TypeId) -> String {
        let class = self.fmt().servant_class(tp);
        let key = self.model.type_identifier(tp);
        if !self.state.declared_pointers.insert(key) {
            return String::new();
        }
        format!(
            "class {c};\ntypedef std::shared_ptr<{c}> {c}P;\ntypedef std::weak_ptr  <{c}> {c}W;\n\n",
            c = class
        )
    }

    fn shortdoc(&self, tp: TypeId) -> String {
        let name = &self.model.get(tp).name;
        let kind = match self.mode {
            GenMode::Servant => "servant",
            GenMode::Handle => "stub",
        };
        format!(
            "/** @interface {name}\n * See also the corresponding C++ {kind} class {}. */\n\
             /// See also the corresponding IDL class {name}.\n",
            self.fmt().class_name(tp)
        )
    }

    fn interface_class(&mut self, tp: TypeId, class_names: &mut Vec<String>) -> String {
        let mut s = String::from("\n");
        class_names.push(
            self.scope
                .namespaced_identifier(self.model, &self.model.get(tp).name),
        );
        if self.mode == GenMode::Servant {
            s.push_str(&self.pointer_decls(tp));
        }
        if self.config.gen_docs {
            s.push_str(&self.shortdoc(tp));
        }
        let f = self.fmt();
        let node = self.model.get(tp);
        let class = f.class_name(tp);
        let handle = f.handle_class(tp);
        let servant = f.servant_class(tp);
        let heritage = "public virtual";
        let _ = write!(
            s,
            "class {} : {} {}\n{{\n",
            class,
            heritage,
            self.inheritance(tp).join(&format!(", {} ", heritage))
        );
        s.push_str("protected:\n");
        if self.mode == GenMode::Servant {
            let _ = writeln!(s, "  explicit{}{} ();", f.pad(" ", 0), class);
            let _ = writeln!(s, "  virtual {}~{} () override = 0;", f.pad(" /*dtor*/ ", -1), class);
        }
        s.push_str("public:\n");
        match self.mode {
            GenMode::Servant => {
                let _ = writeln!(s, "  {}        __handle__         ();", f.pad(&handle, 0));
                let _ = writeln!(
                    s,
                    "  virtual {}__typelist_mt__    () const override;",
                    f.pad("Aida::StringVector", 0)
                );
                if self.config.property_list {
                    let _ = writeln!(
                        s,
                        "  {:<37} __access__         (const std::string &propertyname, const PropertyAccessorPred&) override;",
                        "virtual bool"
                    );
                }
            }
            GenMode::Handle => {
                let _ = writeln!(s, "  {}~{} () override;", f.pad("virtual /*dtor*/ ", -1), class);
                let _ = writeln!(s, "  {}{c} (const {c}&) = default;", f.pad("/*copy*/", 0), c = class);
                let _ = writeln!(s, "  {}operator= (const {}&) = default;", f.pad(&format!("{}&", class), 0), class);
                let _ = writeln!(
                    s,
                    "  {}__cast__ (const RemoteHandle &smh);",
                    f.pad(&format!("static {}", handle), 0)
                );
                let _ = writeln!(s, "  {}{} ();", f.pad("explicit", 0), handle);
            }
        }
        let field_pad = node.fields().iter().map(|fl| fl.name.len()).max().unwrap_or(0);
        for field in node.fields() {
            s.push_str(&self.property_prototype(tp, field, field_pad));
        }
        let method_pad = node
            .methods()
            .iter()
            .map(|m| m.name.len())
            .max()
            .map(|n| n.max(class.len()))
            .unwrap_or(0);
        for method in node.methods() {
            s.push_str(&self.method_decl(tp, method, method_pad));
        }
        s.push_str(&self.insertion(SlotKind::ClassScope, tp));
        match self.mode {
            GenMode::Handle => {
                let _ = writeln!(s, "  __{}_ifx__ ( {}*  __iface__ () const );", self.cppmacro, servant);
                let _ = writeln!(
                    s,
                    "  __{}_ifx__ ( /*conv*/    {} (const std::shared_ptr<{}>&) );",
                    self.cppmacro, class, servant
                );
                s.push_str(&self.insertion(SlotKind::HandleScope, tp));
            }
            GenMode::Servant => s.push_str(&self.insertion(SlotKind::InterfaceScope, tp)),
        }
        s.push_str(&self.accept_accessor(tp));
        s.push_str("};\n");
        if self.mode == GenMode::Handle {
            let cxx = f.cpp_relative(tp);
            let _ = writeln!(
                s,
                "typedef {} {}H; ///< Convenience alias for the IDL type {}.",
                class, cxx, node.name
            );
            let _ = writeln!(s, "typedef ::Aida::ScopedHandle<{c}H> {c}S;", c = cxx);
        }
        s
    }

    fn property_prototype(&self, tp: TypeId, field: &Field, pad: usize) -> String {
        let f = self.fmt();
        let copydoc = if self.config.gen_docs {
            format!(" \t///< See {}::{}", f.cpp_relative(tp), field.name)
        } else {
            String::new()
        };
        let (v, v0, rptr, ptr) = match self.mode {
            GenMode::Servant => ("virtual ", " = 0", "P", "*"),
            GenMode::Handle => ("", "", "", ""),
        };
        let tname = f.class_name(field.ty);
        let pid = format!("{:<width$}", field.name, width = pad);
        let storage = self.storage(field.ty);
        let (getter, setter_arg) = if storage.is_scalar() {
            (tname.clone(), tname.clone())
        } else if storage.is_const_ref() {
            (tname.clone(), format!("const {}&", tname))
        } else if storage == StorageKind::Interface {
            (format!("{}{}", tname, rptr), format!("{}{}", tname, ptr))
        } else {
            return String::new();
        };
        format!(
            "  {v}{}{pid} () const{v0};{copydoc}\n  {v}{}{pid} ({}){v0};{copydoc}\n",
            f.pad(&getter, 0),
            f.pad("void", 0),
            setter_arg
        )
    }

    fn method_decl(&self, tp: TypeId, method: &Method, pad: usize) -> String {
        let f = self.fmt();
        let mut s = String::from("  ");
        if self.mode == GenMode::Servant {
            s.push_str("virtual ");
        }
        s.push_str(&f.pad(&f.return_type(method.ret), 0));
        let _ = write!(s, "{:<width$} (", method.name, width = pad);
        let indent = " ".repeat(s.chars().count());
        let args: Vec<String> = method
            .args
            .iter()
            .map(|a| f.argument(&a.name, a.ty, a.default.as_deref()))
            .collect();
        s.push_str(&args.join(&format!(",\n{}", indent)));
        s.push(')');
        if self.mode == GenMode::Servant && method.pure {
            s.push_str(" = 0");
        }
        s.push(';');
        if self.config.gen_docs {
            let _ = write!(s, " \t///< See {}::{}()", f.cpp_relative(tp), method.name);
        }
        s.push('\n');
        s
    }

    fn accept_accessor(&self, tp: TypeId) -> String {
        let f = self.fmt();
        let class = f.class_name(tp);
        let fields = self.model.get(tp).fields();
        let ancestors = bases(self.model, tp);
        let mut s = String::from("  template<class Visitor> void  __accept_accessor__ (Visitor &__visitor_)\n");
        if fields.is_empty() && ancestors.is_empty() {
            s.push_str("  {}\n");
            return s;
        }
        s.push_str("  {\n");
        for field in fields {
            let _ = writeln!(
                s,
                "    __visitor_ (*this, \"{n}\", &{c}::{n}, &{c}::{n});",
                n = field.name,
                c = class
            );
        }
        for b in ancestors {
            let _ = writeln!(s, "    this->{}::__accept_accessor__ (__visitor_);", f.class_name(b));
        }
        s.push_str("  }\n");
        s
    }

    // ── Servant implementations ─────────────────────────────────────────

    fn server_class_methods(&self, tp: TypeId) -> String {
        let f = self.fmt();
        let class = f.servant_class(tp);
        let handle = f.handle_class(tp);
        let mut s = String::from("\n");
        let _ = write!(s, "{c}::{c} ()\n{{}}\n", c = class);
        let _ = write!(s, "{c}::~{c} ()\n{{}} // define empty dtor to emit vtable\n", c = class);
        let _ = write!(s, "{}\n{}::__handle__()\n{{\n", handle, class);
        s.push_str("  Aida::ExecutionContext &ec = this->__execution_context_mt__();\n");
        let _ = writeln!(s, "  {} handle;", handle);
        let _ = writeln!(
            s,
            "  handle.__iface_ptr__() = std::dynamic_pointer_cast<{}> (ec.adopt_deleter_mt (this->shared_from_this()));",
            class
        );
        s.push_str("  return handle;\n}\n");
        let _ = write!(s, "{h}::{h} (const std::shared_ptr<{c}> &ifacep)\n{{\n", h = handle, c = class);
        s.push_str("  if (!ifacep)\n    return;\n");
        s.push_str("  Aida::ExecutionContext &ec = ifacep->__execution_context_mt__();\n");
        let _ = writeln!(
            s,
            "  __iface_ptr__() = std::dynamic_pointer_cast<{}> (ec.adopt_deleter_mt (ifacep));",
            class
        );
        s.push_str("}\n");
        let _ = write!(s, "{}*\n{}::__iface__() const\n{{\n", class, handle);
        let _ = writeln!(
            s,
            "  return dynamic_cast<{}*> (const_cast<{}*> (this)->__iface_ptr__().get());",
            class, handle
        );
        s.push_str("}\n");
        let _ = write!(s, "Aida::StringVector\n{}::__typelist_mt__ () const\n{{\n  return {{ ", class);
        for an in class_ancestry(self.model, tp) {
            let _ = write!(s, "\"{}\", ", self.model.type_identifier(an));
        }
        s.push_str("};\n}\n");
        s
    }

    fn server_access_impl(&self, tp: TypeId) -> String {
        let f = self.fmt();
        let class = f.class_name(tp);
        let fields = self.model.get(tp).fields();
        let mut s = format!(
            "bool\n{}::__access__ (const std::string &__n, const PropertyAccessorPred &__p)\n{{\n",
            class
        );
        if !fields.is_empty() {
            s.push_str("  const bool __all = __n.empty();\n");
        }
        for field in fields {
            let entries = field_entries(self.model, field.ty, &field.aux_data, "");
            let aux = render_block(&entries, "    ");
            let _ = writeln!(
                s,
                "  const char *const __aux__{} =\n{};",
                field.name,
                aux.trim_end_matches('\n')
            );
            let _ = write!(
                s,
                "  if ((__all || __n == \"{n}\") &&\n      __p (Aida::PropertyAccessorImpl<{c},{t}> \
                 (\"{n}\", *this, &{c}::{n}, &{c}::{n}, __aux__{n})))\n    return true;\n",
                n = field.name,
                c = class,
                t = f.class_name(field.ty)
            );
        }
        for b in bases(self.model, tp) {
            let _ = writeln!(s, "  if (this->{}::__access__ (__n, __p)) return true;", f.class_name(b));
        }
        s.push_str("  return false;\n}\n");
        s
    }

    /// Registry of the identities a servant answers to.
    fn dispatch_table(&self, tp: TypeId) -> String {
        let surface = self.ids.dispatch_surface(tp, self.config.property_list);
        let unique = self.model.absolute_name(tp).replace("::", "_");
        let mut s = format!(
            "static const Aida::DispatchRegistry __aida__dispatch__{}_ (\n  \"{}\", {},\n  {{ // ancestry\n",
            unique,
            self.model.type_identifier(tp),
            surface.class_id.type_hash_expr()
        );
        for (ident, id) in &surface.ancestry {
            let _ = writeln!(s, "    {{ \"{}\", {} }},", ident, id.type_hash_expr());
        }
        s.push_str("  },\n  { // members\n");
        for entry in &surface.entries {
            let _ = writeln!(
                s,
                "    {{ \"{}\", {}, {} }},",
                entry.member,
                entry.role.cpp_name(),
                entry.id.type_hash_expr()
            );
        }
        s.push_str("  });\n");
        s
    }

    // ── Handle implementations ──────────────────────────────────────────

    fn client_class_methods(&self, tp: TypeId) -> String {
        let f = self.fmt();
        let handle = f.handle_class(tp);
        let servant = f.servant_class(tp);
        let mut s = String::new();
        let _ = write!(s, "{h}::{h} ()\n{{}}\n", h = handle);
        let _ = write!(s, "{h}::~{h} ()\n{{}} // define empty dtor to emit vtable\n", h = handle);
        let _ = write!(s, "{h}\n{h}::__cast__ (const Aida::RemoteHandle &other)\n{{\n", h = handle);
        s.push_str("  Aida::ImplicitBaseP &ifacep = const_cast<Aida::RemoteHandle&> (other).__iface_ptr__();\n");
        let _ = writeln!(s, "  return std::dynamic_pointer_cast<{}> (ifacep);", servant);
        s.push_str("}\n");
        s
    }

    fn remote_call(
        &self,
        servant: &str,
        member: &str,
        ret: StorageKind,
        kind: CallKind,
        args: &[(String, TypeId)],
        id: WireId,
    ) -> String {
        let variant = match (ret, kind) {
            (StorageKind::Void, _) => "remote_callv",
            (_, CallKind::Getter) => "remote_callc",
            _ => "remote_callr",
        };
        let (prefix, deref) = match kind {
            CallKind::Method => ("arg_", "*"),
            CallKind::Setter => ("", ""),
            CallKind::Getter => ("", "*"),
        };
        let mut s = format!(
            "  return __AIDA_Local__::{} (*this, &{}::{}, {}",
            variant,
            servant,
            member,
            id.type_hash_expr()
        );
        for (name, ty) in args {
            if self.storage(*ty) == StorageKind::Interface {
                let _ = write!(s, ", {}{}{}.__iface__()", deref, prefix, name);
            } else {
                let _ = write!(s, ", {}{}", prefix, name);
            }
        }
        s.push_str(");\n");
        s
    }

    fn client_property_stub(&self, tp: TypeId, field: &Field) -> String {
        let f = self.fmt();
        let tname = f.class_name(field.ty);
        let servant = f.servant_class(tp);
        let copydoc = if self.config.gen_docs {
            format!(" /// See {}::{}", f.cpp_relative(tp), field.name)
        } else {
            String::new()
        };
        let q = format!("{}::{} (", f.class_name(tp), field.name);
        let storage = self.storage(field.ty);
        let mut s = format!("{}\n{}) const{}\n{{\n", tname, q, copydoc);
        let getter = self.ids.property_identity(tp, &field.name, field.ty, false);
        s.push_str(&self.remote_call(&servant, &field.name, storage, CallKind::Getter, &[], getter));
        s.push_str("}\nvoid\n");
        if storage.is_const_ref() {
            let _ = write!(s, "{}const {} &value){}\n{{\n", q, tname, copydoc);
        } else {
            let _ = write!(s, "{}{} value){}\n{{\n", q, tname, copydoc);
        }
        let setter = self.ids.property_identity(tp, &field.name, field.ty, true);
        s.push_str(&self.remote_call(
            &servant,
            &field.name,
            StorageKind::Void,
            CallKind::Setter,
            &[("value".to_string(), field.ty)],
            setter,
        ));
        s.push_str("}\n");
        s
    }

    fn client_method_stub(&self, tp: TypeId, method: &Method) -> String {
        let f = self.fmt();
        let copydoc = if self.config.gen_docs {
            format!(" /// See {}::{}()", f.cpp_relative(tp), method.name)
        } else {
            String::new()
        };
        let q = format!("{}::{} (", f.class_name(tp), method.name);
        let mut s = format!(
            "{}\n{}{}){}\n{{\n",
            f.class_name(method.ret),
            q,
            f.arguments(&method.args, "arg_", q.chars().count()),
            copydoc
        );
        let args: Vec<(String, TypeId)> = method.args.iter().map(|a| (a.name.clone(), a.ty)).collect();
        s.push_str(&self.remote_call(
            &f.servant_class(tp),
            &method.name,
            self.storage(method.ret),
            CallKind::Method,
            &args,
            self.ids.method_identity(tp, method),
        ));
        s.push_str("}\n");
        s
    }
}

/// C++ spelling of an enumerator value, valid across the full
/// `i64::MIN ..= u64::MAX` range.
pub fn c_long_postfix(value: i128) -> String {
    if value > i64::MAX as i128 {
        format!("{}u", value)
    } else if value == i64::MIN as i128 {
        "(-9223372036854775807 - 1)".to_string()
    } else {
        value.to_string()
    }
}

// ── Property lookup ─────────────────────────────────────────────────────────

/// Model-level evaluation of the generated `__access__` lookup: own fields
/// in declaration order, then each reduced base in order, stopping at the
/// first accepted property.
pub struct PropertyIndex<'a> {
    model: &'a TypeModel,
}

impl<'a> PropertyIndex<'a> {
    pub fn new(model: &'a TypeModel) -> Self {
        PropertyIndex { model }
    }

    /// Offer candidate properties of `iface` named `name` (all properties
    /// when `name` is empty) to `pred` until it accepts one.
    pub fn access(
        &self,
        iface: TypeId,
        name: &str,
        pred: &mut dyn FnMut(TypeId, &'a Field) -> bool,
    ) -> bool {
        let all = name.is_empty();
        for field in self.model.get(iface).fields() {
            if (all || field.name == name) && pred(iface, field) {
                return true;
            }
        }
        for base in bases(self.model, iface) {
            if self.access(base, name, pred) {
                return true;
            }
        }
        false
    }

    /// Owner and definition of the property `name` visible through `iface`.
    pub fn find(&self, iface: TypeId, name: &str) -> Option<(TypeId, &'a Field)> {
        let mut found = None;
        self.access(iface, name, &mut |owner, field| {
            found = Some((owner, field));
            true
        });
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Sha256Digest;
    use crate::model::{Arg, TypeNode};

    struct Fixture {
        model: TypeModel,
        device: TypeId,
    }

    fn iface(name: &str, fields: Vec<Field>, methods: Vec<Method>) -> TypeNode {
        TypeNode::new(name, vec![], TypeKind::Interface { fields, methods })
    }

    fn device_fixture() -> Fixture {
        let mut model = TypeModel::new();
        let string = TypeModel::primitive(StorageKind::String).unwrap();
        let int = TypeModel::primitive(StorageKind::Int32).unwrap();
        let float = TypeModel::primitive(StorageKind::Float64).unwrap();
        let void = TypeModel::primitive(StorageKind::Void).unwrap();
        let object = model.add_type(iface("Object", vec![], vec![]));
        let device = model.add_type(
            iface(
                "Device",
                vec![Field::new("name", string), Field::new("score", int)],
                vec![Method {
                    name: "play".into(),
                    ret: void,
                    args: vec![Arg {
                        name: "speed".into(),
                        ty: float,
                        default: Some("1.0".into()),
                    }],
                    pure: true,
                }],
            )
            .with_prerequisites(vec![object]),
        );
        Fixture { model, device }
    }

    fn config() -> GeneratorConfig {
        let mut cfg = GeneratorConfig::new("device.json");
        cfg.apply_backend_option("macro=DEVICE");
        cfg
    }

    fn run(model: &TypeModel, cfg: &GeneratorConfig, artifact: Artifact) -> String {
        let insertions = Insertions::new();
        let digest = Sha256Digest;
        let inputs = StubInputs {
            model,
            config: cfg,
            insertions: &insertions,
            digest: &digest,
        };
        generate(inputs, artifact, &mut RunState::new())
    }

    #[test]
    fn servant_declares_pure_property_pairs() {
        let f = device_fixture();
        let text = run(&f.model, &config(), Artifact::ServerDecl);
        assert!(text.starts_with("// --- Generated by cxxstub ---\n#ifndef __SRVT__DEVICE\n"));
        assert!(text.contains("class DeviceIface : public virtual ObjectIface\n"));
        assert!(text.contains("class ObjectIface : public virtual Aida::ImplicitBase\n"));
        assert!(text.contains(&format!("  virtual {:<30}{} () const = 0;\n", "std::string", "name ")));
        assert!(text.contains(&format!("  virtual {:<30}{} (const std::string&) = 0;\n", "void", "name ")));
        assert!(text.contains(&format!("  virtual {:<30}score () const = 0;\n", "int")));
        assert!(text.contains("(double speed = 1.0) = 0;\n"));
        assert!(text.contains("#define DEVICE_INTERFACE_LIST \\\n\t  DEVICE_INTERFACE_NAME (Object) \\\n\t  DEVICE_INTERFACE_NAME (Device)\n"));
        assert!(text.trim_end().ends_with("#endif /* __SRVT__DEVICE */"));
    }

    #[test]
    fn handle_declares_plain_accessors() {
        let f = device_fixture();
        let text = run(&f.model, &config(), Artifact::ClientDecl);
        assert!(text.contains("class DeviceHandle : public virtual ObjectHandle\n"));
        assert!(text.contains(&format!("  {:<30}{} () const;\n", "std::string", "name ")));
        assert!(text.contains(&format!("  {:<30}{} (const std::string&);\n", "void", "name ")));
        assert!(text.contains(&format!("  {:<30}__cast__ (const RemoteHandle &smh);\n", "static DeviceHandle")));
        assert!(text.contains(&format!("  {:<30}DeviceHandle ();\n", "explicit")));
        assert!(!text.contains("virtual std::string"));
        assert!(text.contains("  __DEVICE_ifx__ ( DeviceIface*  __iface__ () const );\n"));
        assert!(text.contains("typedef DeviceHandle DeviceH;"));
    }

    #[test]
    fn handle_impl_registers_aux_data() {
        let f = device_fixture();
        let text = run(&f.model, &config(), Artifact::ClientImpl);
        for entry in [
            "  \"typename=Device\\0\"\n",
            "  \"type=INTERFACE\\0\"\n",
            "  \"name.type=STRING\\0\"\n",
            "  \"score.type=INT32\\0\"\n",
        ] {
            assert!(text.contains(entry), "missing {:?}", entry);
        }
        assert!(text.contains("static const Aida::IntrospectionRegistry __aida__aux__data__Device_ = {\n"));
    }

    #[test]
    fn member_identities_agree_across_artifacts() {
        let f = device_fixture();
        let cfg = config();
        let digest = Sha256Digest;
        let ids = IdentityComposer::new(&f.model, &digest);
        let string = TypeModel::primitive(StorageKind::String).unwrap();
        let getter = ids.property_identity(f.device, "name", string, false).type_hash_expr();
        let setter = ids.property_identity(f.device, "name", string, true).type_hash_expr();
        let server = run(&f.model, &cfg, Artifact::ServerImpl);
        let client = run(&f.model, &cfg, Artifact::ClientImpl);
        assert!(client.contains(&format!(
            "  return __AIDA_Local__::remote_callc (*this, &DeviceIface::name, {});\n",
            getter
        )));
        assert!(client.contains(&format!(
            "  return __AIDA_Local__::remote_callv (*this, &DeviceIface::name, {}, value);\n",
            setter
        )));
        assert!(server.contains(&format!("{{ \"name\", Aida::DispatchRole::GETTER, {} }}", getter)));
        assert!(server.contains(&format!("{{ \"name\", Aida::DispatchRole::SETTER, {} }}", setter)));
    }

    #[test]
    fn pointer_aliases_are_emitted_once_per_run() {
        let mut model = TypeModel::new();
        model.add_type(iface("Device", vec![], vec![]).forward());
        model.add_type(iface("Device", vec![], vec![]));
        let cfg = config();
        let insertions = Insertions::new();
        let digest = Sha256Digest;
        let inputs = StubInputs {
            model: &model,
            config: &cfg,
            insertions: &insertions,
            digest: &digest,
        };
        let alias = "typedef std::shared_ptr<DeviceIface> DeviceIfaceP;\n";
        let mut state = RunState::new();
        let first = generate(inputs, Artifact::ServerDecl, &mut state);
        assert_eq!(first.matches(alias).count(), 1);
        assert!(state.has_pointer_decl("Device"));
        let second = generate(inputs, Artifact::ServerDecl, &mut state);
        assert_eq!(second.matches(alias).count(), 0);
    }

    #[test]
    fn shared_namespace_prefix_stays_open() {
        let mut model = TypeModel::new();
        let int = TypeModel::primitive(StorageKind::Int32).unwrap();
        let ns1 = model.intern_namespace(&["ns1"]);
        let ns2 = model.intern_namespace(&["ns1", "ns2"]);
        for (name, ns) in [("A", &ns1), ("B", &ns1), ("C", &ns2), ("D", &ns1)] {
            model.add_type(TypeNode::new(
                name,
                ns.clone(),
                TypeKind::Record {
                    fields: vec![Field::new("x", int)],
                },
            ));
        }
        let text = run(&model, &config(), Artifact::ClientDecl);
        assert_eq!(text.matches("namespace ns1 {").count(), 1);
        assert_eq!(text.matches("} // ns1\n").count(), 1);
        assert_eq!(text.matches("namespace ns2 {").count(), 2);
    }

    #[test]
    fn property_list_off_drops_access() {
        let f = device_fixture();
        let mut cfg = config();
        assert!(cfg.apply_backend_option("property-list=false"));
        let decl = run(&f.model, &cfg, Artifact::ServerDecl);
        let imp = run(&f.model, &cfg, Artifact::ServerImpl);
        assert!(!decl.contains("__access__"));
        assert!(!imp.contains("__access__"));
        let on = run(&f.model, &config(), Artifact::ServerImpl);
        assert!(on.contains("bool\nDeviceIface::__access__ (const std::string &__n, const PropertyAccessorPred &__p)\n"));
        assert!(on.contains("  if (this->ObjectIface::__access__ (__n, __p)) return true;\n"));
        assert!(on.contains("{ \"__access__\", Aida::DispatchRole::INTERNAL, "));
    }

    #[test]
    fn enum_values_cover_full_range() {
        assert_eq!(c_long_postfix(42), "42");
        assert_eq!(c_long_postfix(-1), "-1");
        assert_eq!(c_long_postfix(u64::MAX as i128), "18446744073709551615u");
        assert_eq!(c_long_postfix(i64::MIN as i128), "(-9223372036854775807 - 1)");
    }

    #[test]
    fn property_lookup_delegates_to_ancestors() {
        let mut model = TypeModel::new();
        let float = TypeModel::primitive(StorageKind::Float64).unwrap();
        let string = TypeModel::primitive(StorageKind::String).unwrap();
        let base = model.add_type(iface("Base", vec![Field::new("volume", float)], vec![]));
        let derived = model.add_type(
            iface("Derived", vec![Field::new("name", string)], vec![]).with_prerequisites(vec![base]),
        );
        let index = PropertyIndex::new(&model);
        let (owner, field) = index.find(derived, "volume").unwrap();
        assert_eq!(owner, base);
        assert_eq!(field.name, "volume");
        assert!(index.find(derived, "nonexistent").is_none());

        let mut seen = Vec::new();
        let accepted = index.access(derived, "", &mut |_, field| {
            seen.push(field.name.clone());
            field.name == "name"
        });
        assert!(accepted);
        assert_eq!(seen, vec!["name"]);
    }
}
