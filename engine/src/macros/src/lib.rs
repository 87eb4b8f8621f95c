mod derive;

use proc_macro::TokenStream;

#[proc_macro_derive(Component)]
pub fn derive_component(item: TokenStream) -> TokenStream {
    derive::marker_impl(item, "component", "Component")
}

#[proc_macro_derive(Resource)]
pub fn derive_resource(item: TokenStream) -> TokenStream {
    derive::marker_impl(item, "resource", "Resource")
}

#[proc_macro_derive(Event)]
pub fn derive_event(item: TokenStream) -> TokenStream {
    derive::marker_impl(item, "event", "Event")
}
