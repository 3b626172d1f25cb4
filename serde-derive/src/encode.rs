use proc_macro::TokenStream;
use quote::quote;

pub fn impl_encode(ast: &syn::DeriveInput) -> TokenStream {
    let name = &ast.ident;
    let fields = match &ast.data {
        syn::Data::Struct(data) => &data.fields,
        _ => panic!("Encode only supports structs; write enum codecs by hand"),
    };

    let statements: Vec<_> = fields
        .iter()
        .enumerate()
        .map(|(index, field)| match &field.ident {
            Some(id) => quote! { self.#id.encode(&mut writer)?; },
            None => {
                let index = syn::Index::from(index);
                quote! { self.#index.encode(&mut writer)?; }
            }
        })
        .collect();

    let expanded = quote! {
        impl thunderbolt_chain::codec::Encode for #name {
            fn encode<W: ::std::io::Write>(&self, mut writer: W) -> ::std::io::Result<()> {
                #(#statements)*
                Ok(())
            }
        }
    };

    TokenStream::from(expanded)
}
