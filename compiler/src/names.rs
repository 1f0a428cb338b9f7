// names.rs — C++ name and signature rendering
//
// Maps type nodes to C++ spellings for the two generation modes. Servant
// mode names interface classes `XIface` and passes them around as
// `XIfaceP` shared pointers; handle mode names them `XHandle` and stores
// them as `Aida::RemoteMember<XHandle>`. Everything else renders the same in
// both modes, which is what lets the independently compiled client and
// server artifacts line up.
//
// Preconditions: the `NamespaceScope` reflects the position in the output
//                where the rendered text will be placed.
// Postconditions: identical (type, mode, scope) inputs render identically.
// Failure modes: none.
// Side effects: none.

use crate::id::TypeId;
use crate::model::{Arg, StorageKind, TypeModel};
use crate::scope::NamespaceScope;

/// Which side of the protocol is being generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenMode {
    /// Server-side implementation classes (`*_interfaces.*`).
    Servant,
    /// Client-side remote handles (`*_handles.*`).
    Handle,
}

pub const DEFAULT_TAB_STOP: usize = 26;

/// Suffix of servant class names.
pub const SERVANT_SUFFIX: &str = "Iface";
/// Suffix of remote handle class names.
pub const HANDLE_SUFFIX: &str = "Handle";

fn primitive_cpp(kind: StorageKind) -> Option<&'static str> {
    Some(match kind {
        StorageKind::Void => "void",
        StorageKind::Bool => "bool",
        StorageKind::Int32 => "int",
        StorageKind::Int64 => "int64_t",
        StorageKind::Float64 => "double",
        StorageKind::String => "std::string",
        StorageKind::Any => "Aida::Any",
        StorageKind::Enum
        | StorageKind::Record
        | StorageKind::Sequence
        | StorageKind::Interface => return None,
    })
}

/// Renders names for one generation mode at one scope position.
#[derive(Debug, Clone, Copy)]
pub struct Formatter<'a> {
    model: &'a TypeModel,
    scope: &'a NamespaceScope,
    mode: GenMode,
    tab: usize,
}

impl<'a> Formatter<'a> {
    pub fn new(model: &'a TypeModel, scope: &'a NamespaceScope, mode: GenMode) -> Self {
        Formatter {
            model,
            scope,
            mode,
            tab: DEFAULT_TAB_STOP,
        }
    }

    pub fn with_tab_stop(mut self, tab: usize) -> Self {
        self.tab = tab;
        self
    }

    pub fn mode(&self) -> GenMode {
        self.mode
    }

    fn storage(&self, ty: TypeId) -> StorageKind {
        self.model.get(ty).storage()
    }

    /// C++ type spelled relative to the open namespace scope.
    pub fn cpp_relative(&self, ty: TypeId) -> String {
        let node = self.model.get(ty);
        if let Some(p) = primitive_cpp(node.storage()) {
            return p.to_string();
        }
        let mut parts = self.scope.relative_namespaces(self.model, &node.namespace);
        parts.push(&node.name);
        parts.join("::")
    }

    /// Fully qualified C++ type.
    pub fn cpp_absolute(&self, ty: TypeId) -> String {
        match primitive_cpp(self.storage(ty)) {
            Some(p) => p.to_string(),
            None => self.model.absolute_name(ty),
        }
    }

    /// Servant class name: `XIface` for interfaces.
    pub fn servant_class(&self, ty: TypeId) -> String {
        let name = self.cpp_relative(ty);
        match self.storage(ty) {
            StorageKind::Interface => name + SERVANT_SUFFIX,
            _ => name,
        }
    }

    /// Remote handle class name: `XHandle` for interfaces.
    pub fn handle_class(&self, ty: TypeId) -> String {
        let name = self.cpp_relative(ty);
        match self.storage(ty) {
            StorageKind::Interface => name + HANDLE_SUFFIX,
            _ => name,
        }
    }

    /// Class name in the active mode.
    pub fn class_name(&self, ty: TypeId) -> String {
        match self.mode {
            GenMode::Servant => self.servant_class(ty),
            GenMode::Handle => self.handle_class(ty),
        }
    }

    /// Return type: servants hand out interfaces as `XIfaceP`.
    pub fn return_type(&self, ty: TypeId) -> String {
        let name = self.class_name(ty);
        if self.mode == GenMode::Servant && self.storage(ty) == StorageKind::Interface {
            name + "P"
        } else {
            name
        }
    }

    /// Type of a record field or sequence element.
    pub fn member_type(&self, ty: TypeId) -> String {
        if self.mode == GenMode::Handle && self.storage(ty) == StorageKind::Interface {
            format!("Aida::RemoteMember<{}>", self.handle_class(ty))
        } else {
            self.return_type(ty)
        }
    }

    /// Declaration of a call argument, e.g. `const std::string &name` or
    /// `Kind kind = Kind (3)`.
    pub fn argument(&self, ident: &str, ty: TypeId, default: Option<&str>) -> String {
        let storage = self.storage(ty);
        let constref = storage.is_const_ref();
        let needsref = constref || storage == StorageKind::Interface;
        let class = self.class_name(ty);
        let mut s = String::new();
        if constref {
            s.push_str("const ");
        }
        s.push_str(&class);
        if !ident.is_empty() {
            s.push(' ');
        }
        if needsref {
            s.push('&');
        }
        s.push_str(ident);
        if let Some(default) = default {
            match storage {
                StorageKind::Enum => s.push_str(&format!(" = {} ({})", class, default)),
                StorageKind::Sequence | StorageKind::Record => {
                    s.push_str(&format!(" = {}()", class))
                }
                StorageKind::Interface => s.push_str(&format!(" = *({}*) NULL", class)),
                _ => s.push_str(&format!(" = {}", default)),
            }
        }
        s
    }

    /// Argument list without defaults, each name prefixed with `prefix`,
    /// continuation lines indented by `indent` columns.
    pub fn arguments(&self, args: &[Arg], prefix: &str, indent: usize) -> String {
        let separator = format!(",\n{}", " ".repeat(indent));
        args.iter()
            .map(|a| self.argument(&format!("{}{}", prefix, a.name), a.ty, None))
            .collect::<Vec<_>>()
            .join(&separator)
    }

    /// Pad `s` to the tab stop (shifted by `delta`), at least one space.
    pub fn pad(&self, s: &str, delta: isize) -> String {
        let width = self.tab as isize + delta - s.chars().count() as isize;
        format!("{}{}", s, " ".repeat(width.max(1) as usize))
    }

    /// Zero/default value expression.
    pub fn zero_value(&self, ty: TypeId) -> String {
        match self.storage(ty) {
            StorageKind::String => "\"\"".to_string(),
            StorageKind::Enum => format!("{} (0)", self.class_name(ty)),
            StorageKind::Record | StorageKind::Sequence | StorageKind::Any => {
                format!("{}()", self.class_name(ty))
            }
            StorageKind::Void
            | StorageKind::Bool
            | StorageKind::Int32
            | StorageKind::Int64
            | StorageKind::Float64
            | StorageKind::Interface => "0".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Field, TypeKind, TypeNode};

    struct Fixture {
        model: TypeModel,
        iface: TypeId,
        record: TypeId,
        kind: TypeId,
        seq: TypeId,
    }

    fn fixture() -> Fixture {
        let mut model = TypeModel::new();
        let ns = model.intern_namespace(&["Bse"]);
        let int = TypeModel::primitive(StorageKind::Int32).unwrap();
        let iface = model.add_type(TypeNode::new(
            "Device",
            ns.clone(),
            TypeKind::Interface {
                fields: vec![],
                methods: vec![],
            },
        ));
        let record = model.add_type(TypeNode::new(
            "Point",
            ns.clone(),
            TypeKind::Record {
                fields: vec![Field::new("x", int)],
            },
        ));
        let kind = model.add_type(TypeNode::new(
            "Kind",
            ns.clone(),
            TypeKind::Enum {
                values: vec![],
                combinable: false,
            },
        ));
        let seq = model.add_type(TypeNode::new(
            "DeviceSeq",
            ns,
            TypeKind::Sequence {
                element: Field::new("devices", iface),
            },
        ));
        Fixture {
            model,
            iface,
            record,
            kind,
            seq,
        }
    }

    fn open_bse(model: &TypeModel) -> NamespaceScope {
        let mut scope = NamespaceScope::new();
        let ns = model.get(model.lookup("Bse.Device").unwrap()).namespace.clone();
        scope.enter(model, &ns);
        scope
    }

    #[test]
    fn class_names_per_mode() {
        let f = fixture();
        let scope = open_bse(&f.model);
        let servant = Formatter::new(&f.model, &scope, GenMode::Servant);
        let handle = Formatter::new(&f.model, &scope, GenMode::Handle);
        assert_eq!(servant.class_name(f.iface), "DeviceIface");
        assert_eq!(handle.class_name(f.iface), "DeviceHandle");
        assert_eq!(servant.class_name(f.record), "Point");
        assert_eq!(handle.class_name(f.record), "Point");
        assert_eq!(servant.return_type(f.iface), "DeviceIfaceP");
        assert_eq!(handle.return_type(f.iface), "DeviceHandle");
    }

    #[test]
    fn names_outside_scope_are_qualified() {
        let f = fixture();
        let scope = NamespaceScope::new();
        let handle = Formatter::new(&f.model, &scope, GenMode::Handle);
        assert_eq!(handle.class_name(f.iface), "Bse::DeviceHandle");
        assert_eq!(handle.cpp_absolute(f.record), "Bse::Point");
    }

    #[test]
    fn member_type_wraps_interfaces_for_handles() {
        let f = fixture();
        let scope = open_bse(&f.model);
        let handle = Formatter::new(&f.model, &scope, GenMode::Handle);
        let servant = Formatter::new(&f.model, &scope, GenMode::Servant);
        assert_eq!(
            handle.member_type(f.iface),
            "Aida::RemoteMember<DeviceHandle>"
        );
        assert_eq!(servant.member_type(f.iface), "DeviceIfaceP");
        let int = TypeModel::primitive(StorageKind::Int32).unwrap();
        assert_eq!(handle.member_type(int), "int");
    }

    #[test]
    fn argument_passing_conventions() {
        let f = fixture();
        let scope = open_bse(&f.model);
        let fmt = Formatter::new(&f.model, &scope, GenMode::Handle);
        let string = TypeModel::primitive(StorageKind::String).unwrap();
        let float = TypeModel::primitive(StorageKind::Float64).unwrap();
        assert_eq!(fmt.argument("name", string, None), "const std::string &name");
        assert_eq!(fmt.argument("p", f.record, None), "const Point &p");
        assert_eq!(fmt.argument("d", f.iface, None), "DeviceHandle &d");
        assert_eq!(fmt.argument("x", float, Some("1.5")), "double x = 1.5");
        assert_eq!(fmt.argument("k", f.kind, Some("2")), "Kind k = Kind (2)");
        assert_eq!(fmt.argument("s", f.seq, Some("")), "const DeviceSeq &s = DeviceSeq()");
        assert_eq!(
            fmt.argument("d", f.iface, Some("NULL")),
            "DeviceHandle &d = *(DeviceHandle*) NULL"
        );
        assert_eq!(fmt.argument("", string, None), "const std::string&");
    }

    #[test]
    fn zero_values() {
        let f = fixture();
        let scope = open_bse(&f.model);
        let fmt = Formatter::new(&f.model, &scope, GenMode::Handle);
        let string = TypeModel::primitive(StorageKind::String).unwrap();
        let any = TypeModel::primitive(StorageKind::Any).unwrap();
        let int = TypeModel::primitive(StorageKind::Int64).unwrap();
        assert_eq!(fmt.zero_value(string), "\"\"");
        assert_eq!(fmt.zero_value(f.kind), "Kind (0)");
        assert_eq!(fmt.zero_value(f.record), "Point()");
        assert_eq!(fmt.zero_value(any), "Aida::Any()");
        assert_eq!(fmt.zero_value(int), "0");
    }

    #[test]
    fn pad_reaches_tab_stop() {
        let f = fixture();
        let scope = NamespaceScope::new();
        let fmt = Formatter::new(&f.model, &scope, GenMode::Servant).with_tab_stop(8);
        assert_eq!(fmt.pad("int", 0), "int     ");
        assert_eq!(fmt.pad("int", -2), "int   ");
        assert_eq!(fmt.pad("a_very_long_name", 0), "a_very_long_name ");
    }

    #[test]
    fn argument_lists_align_continuations() {
        let f = fixture();
        let scope = open_bse(&f.model);
        let fmt = Formatter::new(&f.model, &scope, GenMode::Handle);
        let int = TypeModel::primitive(StorageKind::Int32).unwrap();
        let args = vec![
            Arg {
                name: "a".into(),
                ty: int,
                default: None,
            },
            Arg {
                name: "p".into(),
                ty: f.record,
                default: Some("ignored".into()),
            },
        ];
        assert_eq!(
            fmt.arguments(&args, "arg_", 4),
            "int arg_a,\n    const Point &arg_p"
        );
    }
}
