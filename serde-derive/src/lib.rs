//! Derive macros for the consensus wire codec (`thunderbolt_chain::codec`).
//!
//! `#[derive(Encode)]` and `#[derive(Decode)]` generate field-by-field
//! implementations for plain structs, in declaration order. Enums (tagged
//! unions like locking parameters) are always written by hand, the same way
//! the teacher this crate is modeled on hand-writes its own enum codecs.

extern crate proc_macro;
use proc_macro::TokenStream;

mod decode;
mod encode;

#[proc_macro_derive(Decode)]
pub fn derive_decode(input: TokenStream) -> TokenStream {
    let ast = syn::parse(input).expect("Decode can only be derived for structs");
    decode::impl_decode(&ast)
}

#[proc_macro_derive(Encode)]
pub fn derive_encode(input: TokenStream) -> TokenStream {
    let ast = syn::parse(input).expect("Encode can only be derived for structs");
    encode::impl_encode(&ast)
}
