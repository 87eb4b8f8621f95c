use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{DeriveInput, parse_macro_input};

/// Emit a marker trait impl for the annotated type.
///
/// The paths go through `::ember_engine::<module>::<trait>`, which resolves both inside
/// and outside the engine crate. Inside, it works because of
/// `extern crate self as ember_engine;` in the engine's lib.rs. Outside, it naturally
/// resolves to the ember_engine dependency.
pub fn marker_impl(input: TokenStream, module: &str, trait_name: &str) -> TokenStream {
    // Parse the input tokens into a syntax tree
    let ast = parse_macro_input!(input as DeriveInput);

    let type_name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let module = format_ident!("{}", module);
    let trait_name = format_ident!("{}", trait_name);

    TokenStream::from(quote! {
        impl #impl_generics ::ember_engine::#module::#trait_name for #type_name #ty_generics #where_clause {
        }
    })
}
