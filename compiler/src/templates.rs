// templates.rs — Fixed boilerplate spliced into the implementation artifacts
//
// `$AIDA_iface_base$` is replaced by the configured implicit servant base.

/// Placeholder for the implicit servant base class.
pub const IFACE_BASE_VAR: &str = "$AIDA_iface_base$";

/// Prologue of `*_interfaces.cc`.
pub const SERVER_CC: &str = r#"
// --- ServerImpl Boilerplate ---
#include <memory>
#include <type_traits>

namespace { // Anon
namespace __AIDA_Local__ {

static_assert (std::is_base_of<Aida::ImplicitBase, $AIDA_iface_base$>::value,
               "implicit servant base must derive from Aida::ImplicitBase");

// Dispatch tables below register themselves on construction.
using DispatchEntry = Aida::DispatchRegistry::Entry;

} } // Anon::__AIDA_Local__
"#;

/// Prologue of `*_handles.cc`. Every remote call carries the wire identity
/// of the invoked member right after the member pointer.
pub const CLIENT_CC: &str = r#"
// --- ClientHH Boilerplate ---
#include <memory>
#include <utility>

namespace { // Anon
namespace __AIDA_Local__ {

// Resolve the servant behind a remote handle.
template<class C> static inline C*
servant_of (const Aida::RemoteHandle &h)
{
  return dynamic_cast<C*> (const_cast<Aida::RemoteHandle&> (h).__iface_ptr__().get());
}

// Call a void method, no result is transferred.
template<class C, class ...MArgs, class ...CArgs> static inline void
remote_callv (Aida::RemoteHandle &h, void (C::*const mfp) (MArgs...), const Aida::TypeHash &id, CArgs&&... args)
{
  C *const self = servant_of<C> (h);
  AIDA_ASSERT_RETURN (self != NULL);
  Aida::ExecutionContext &ec = self->__execution_context_mt__();
  ec.enqueue_mt (id, [self, mfp, args...] () { (self->*mfp) (args...); });
}

// Call a const method (property getters) and wait for its result.
template<class R, class C, class ...MArgs, class ...CArgs> static inline R
remote_callc (const Aida::RemoteHandle &h, R (C::*const mfp) (MArgs...) const, const Aida::TypeHash &id, CArgs&&... args)
{
  const C *const self = servant_of<C> (h);
  AIDA_ASSERT_RETURN (self != NULL, R());
  Aida::ExecutionContext &ec = self->__execution_context_mt__();
  return ec.call_mt<R> (id, [self, mfp, &args...] () { return (self->*mfp) (args...); });
}

// Call a non-void method and wait for its result.
template<class R, class C, class ...MArgs, class ...CArgs> static inline R
remote_callr (Aida::RemoteHandle &h, R (C::*const mfp) (MArgs...), const Aida::TypeHash &id, CArgs&&... args)
{
  C *const self = servant_of<C> (h);
  AIDA_ASSERT_RETURN (self != NULL, R());
  Aida::ExecutionContext &ec = self->__execution_context_mt__();
  return ec.call_mt<R> (id, [self, mfp, &args...] () { return (self->*mfp) (args...); });
}

} } // Anon::__AIDA_Local__
"#;

/// Expand template variables.
pub fn expand(template: &str, iface_base: &str) -> String {
    template.replace(IFACE_BASE_VAR, iface_base)
}
