//! Procedural macros for testkit-double
//!
//! This crate provides the `#[testkit_double::test]` attribute macro, which
//! tears down the mocks a test created once the test finishes.
//!
//! # Example
//!
//! ```rust,ignore
//! use testkit_double::prelude::*;
//!
//! #[testkit_double::test]
//! fn my_test(mock: Mock) {
//!     mock.when("ping").unwrap().invoke(args![]).unwrap().then_return("pong");
//!     assert_eq!(mock.record("ping", args![]).unwrap(), Value::from("pong"));
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse::{Parse, ParseStream},
    parse_macro_input, FnArg, Ident, ItemFn, Lit, Pat, Token, Type,
};

/// Configuration options for the test macro.
#[derive(Default)]
struct TestConfig {
    /// What to sweep after the test ("unstub", "reset" or "all")
    teardown: Option<String>,
}

impl Parse for TestConfig {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut config = TestConfig::default();

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            match ident.to_string().as_str() {
                "teardown" => {
                    let lit: Lit = input.parse()?;
                    if let Lit::Str(s) = lit {
                        config.teardown = Some(s.value());
                    } else {
                        return Err(syn::Error::new_spanned(lit, "expected a string"));
                    }
                }
                _ => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute: {ident}"),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(config)
    }
}

/// Determines if a function parameter is requesting a Mock.
fn is_mock_param(arg: &FnArg) -> bool {
    if let FnArg::Typed(pat_type) = arg {
        if let Type::Path(type_path) = &*pat_type.ty {
            if let Some(segment) = type_path.path.segments.last() {
                return segment.ident == "Mock";
            }
        }
    }
    false
}

/// Extracts the parameter name from a function argument.
fn get_param_name(arg: &FnArg) -> Option<&Pat> {
    if let FnArg::Typed(pat_type) = arg {
        Some(&pat_type.pat)
    } else {
        None
    }
}

/// Test attribute macro that tears down mocks when the test ends.
///
/// The generated test holds a `testkit_double::registry::Teardown` guard, so
/// the sweep runs whether the test returns or panics. Only mocks created on
/// the test's own thread are touched; tests running in parallel keep their
/// stubs.
///
/// # Basic Usage
///
/// ```rust,ignore
/// use testkit_double::prelude::*;
///
/// #[testkit_double::test]
/// fn test_basic() {
///     let clock = DynObject::new("clock").with_method("now", Binding::free(|_| Ok(Value::from(0))));
///     let mock = Mock::of(clock.clone());
///     mock.when("now").unwrap().invoke(args![]).unwrap().then_return(5);
///     assert_eq!(clock.invoke("now", args![]).unwrap(), Value::from(5));
/// }
/// ```
///
/// # With Mock Injection
///
/// Every parameter of type `Mock` receives a fresh synthetic mock named
/// after the parameter:
///
/// ```rust,ignore
/// #[testkit_double::test]
/// fn test_with_mocks(store: Mock, cache: Mock) {
///     assert_eq!(store.name(), "store");
///     assert!(cache.history().is_empty());
/// }
/// ```
///
/// # Configuration Options
///
/// - `teardown = "unstub"` (default), `"reset"` or `"all"` - What the sweep does
///
/// ```rust,ignore
/// #[testkit_double::test(teardown = "all")]
/// fn test_full_teardown(mock: Mock) {
///     mock.record("x", args![]).unwrap();
/// }
/// ```
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let config = parse_macro_input!(attr as TestConfig);
    let input = parse_macro_input!(item as ItemFn);

    expand_test(config, input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_test(config: TestConfig, input: ItemFn) -> syn::Result<TokenStream2> {
    let name = &input.sig.ident;
    let body = &input.block;
    let attrs = &input.attrs;
    let vis = &input.vis;
    let output = &input.sig.output;

    if let Some(asyncness) = &input.sig.asyncness {
        return Err(syn::Error::new_spanned(
            asyncness,
            "test function must not be async",
        ));
    }

    let scope = match config.teardown.as_deref().unwrap_or("unstub") {
        "unstub" => quote! { ::testkit_double::registry::TeardownScope::Unstub },
        "reset" => quote! { ::testkit_double::registry::TeardownScope::Reset },
        "all" => quote! { ::testkit_double::registry::TeardownScope::All },
        other => {
            return Err(syn::Error::new(
                proc_macro2::Span::call_site(),
                format!("unsupported teardown: {other}. Use \"unstub\", \"reset\" or \"all\""),
            ));
        }
    };

    // Every other parameter is an error: the harness calls tests without arguments
    let mut mock_inits = Vec::new();
    for arg in &input.sig.inputs {
        if !is_mock_param(arg) {
            return Err(syn::Error::new_spanned(
                arg,
                "only `Mock` parameters can be injected",
            ));
        }
        let Some(param) = get_param_name(arg) else {
            return Err(syn::Error::new_spanned(arg, "unsupported parameter"));
        };
        let label = match param {
            Pat::Ident(ident) => ident.ident.to_string(),
            other => quote!(#other).to_string(),
        };
        mock_inits.push(quote! {
            let #param = ::testkit_double::mock::MockBuilder::new().name(#label).build();
        });
    }

    Ok(quote! {
        #[::core::prelude::v1::test]
        #(#attrs)*
        #vis fn #name() #output {
            let _teardown = ::testkit_double::registry::Teardown::new(#scope);
            #(#mock_inits)*
            #body
        }
    })
}
