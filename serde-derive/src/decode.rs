use proc_macro::TokenStream;
use quote::quote;

pub fn impl_decode(ast: &syn::DeriveInput) -> TokenStream {
    let name = &ast.ident;
    let data = match &ast.data {
        syn::Data::Struct(data) => data,
        _ => panic!("Decode only supports structs; write enum codecs by hand"),
    };

    let is_tuple = matches!(data.fields, syn::Fields::Unnamed(_));

    let statements: Vec<_> = data
        .fields
        .iter()
        .map(|field| {
            let ty = &field.ty;
            match &field.ident {
                Some(id) => quote! { #id: <#ty as thunderbolt_chain::codec::Decode>::decode(&mut reader)?, },
                None => quote! { <#ty as thunderbolt_chain::codec::Decode>::decode(&mut reader)?, },
            }
        })
        .collect();

    let expanded = if is_tuple {
        quote! {
            impl thunderbolt_chain::codec::Decode for #name {
                fn decode<R: ::std::io::Read>(mut reader: R) -> Result<Self, thunderbolt_chain::codec::CodecError> {
                    Ok(#name ( #(#statements)* ))
                }
            }
        }
    } else {
        quote! {
            impl thunderbolt_chain::codec::Decode for #name {
                fn decode<R: ::std::io::Read>(mut reader: R) -> Result<Self, thunderbolt_chain::codec::CodecError> {
                    Ok(#name { #(#statements)* })
                }
            }
        }
    };

    TokenStream::from(expanded)
}
