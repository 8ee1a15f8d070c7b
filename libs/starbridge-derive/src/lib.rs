use proc_macro::TokenStream;
use proc_macro2::Literal;
use quote::quote;
use syn::ext::IdentExt;
use syn::parse::ParseStream;
use syn::{
    Attribute, Data, DeriveInput, Fields, Ident, LitStr, Token, Visibility, parse_macro_input,
    parse_quote,
};

/// Derive macro for record conversion.
///
/// Implements `starbridge::Reflect` and `starbridge::Record` for a struct
/// with named fields (or a unit struct). The struct must also implement
/// `Debug`, and `Default` wherever it is allocated on demand (inside an
/// `Option` or a `Vec`).
///
/// # Example
///
/// ```ignore
/// #[derive(Debug, Default, Record)]
/// pub struct Target {
///     pub name: String,
///     #[star("srcs,astuple")]
///     pub sources: Vec<String>,
///     #[star("-")]
///     pub cache: Vec<u8>,
///     #[star(embed)]
///     pub common: Common,
/// }
/// ```
///
/// Only `pub` fields are converted, embedded ones included.
#[proc_macro_derive(Record, attributes(star))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_impl(&input) {
        Ok(tokens) => tokens,
        Err(e) => e.to_compile_error().into(),
    }
}

#[derive(Default)]
struct StarAttrs {
    directive: Option<LitStr>,
    embed: bool,
}

fn derive_impl(input: &DeriveInput) -> Result<TokenStream, syn::Error> {
    let name = &input.ident;
    let name_str = name.unraw().to_string();

    let fields: Vec<&syn::Field> = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => fields.named.iter().collect(),
            Fields::Unit => Vec::new(),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Record only supports structs with named fields",
                ));
            }
        },
        _ => return Err(syn::Error::new_spanned(name, "Record only supports structs")),
    };

    if let Some(lt) = input.generics.lifetimes().next() {
        return Err(syn::Error::new_spanned(
            lt,
            "Record does not support lifetime parameters",
        ));
    }

    let mut generics = input.generics.clone();
    if !generics.params.is_empty() {
        let where_clause = generics.make_where_clause();
        for field in &fields {
            let ty = &field.ty;
            where_clause
                .predicates
                .push(parse_quote! { #ty: ::starbridge::Reflect });
        }
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let mut descriptors = Vec::new();
    let mut getters = Vec::new();
    let mut setters = Vec::new();

    for (index, field) in fields.iter().enumerate() {
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected named field"))?;
        let field_name = ident.unraw().to_string();
        let ty = &field.ty;
        let attrs = parse_star_attrs(&field.attrs)?;

        let directive = attrs
            .directive
            .unwrap_or_else(|| LitStr::new("", proc_macro2::Span::call_site()));
        let embedded = attrs.embed.then(|| quote! { .embedded() });
        let private = matches!(field.vis, Visibility::Inherited).then(|| quote! { .private() });

        descriptors.push(quote! {
            ::starbridge::Field::new(
                #field_name,
                #directive,
                <#ty as ::starbridge::Reflect>::static_shape(),
            )
            #embedded
            #private
        });

        let index = Literal::usize_unsuffixed(index);
        getters.push(quote! {
            #index => ::std::option::Option::Some(&self.#ident),
        });
        setters.push(quote! {
            #index => ::std::option::Option::Some(&mut self.#ident),
        });
    }

    let expanded = quote! {
        impl #impl_generics ::starbridge::Reflect for #name #ty_generics #where_clause {
            fn static_shape() -> ::starbridge::Shape {
                ::starbridge::Shape::Record(#name_str)
            }

            fn shape(&self) -> ::starbridge::Shape {
                <Self as ::starbridge::Reflect>::static_shape()
            }

            fn peek(&self) -> ::starbridge::Peek<'_> {
                ::starbridge::Peek::Record(self)
            }

            fn poke(&mut self) -> ::starbridge::Poke<'_> {
                ::starbridge::Poke::Record(self)
            }
        }

        impl #impl_generics ::starbridge::Record for #name #ty_generics #where_clause {
            fn fields(&self) -> ::std::vec::Vec<::starbridge::Field> {
                ::std::vec![
                    #(#descriptors),*
                ]
            }

            fn field(&self, index: usize) -> ::std::option::Option<&dyn ::starbridge::Reflect> {
                match index {
                    #(#getters)*
                    _ => ::std::option::Option::None,
                }
            }

            fn field_mut(
                &mut self,
                index: usize,
            ) -> ::std::option::Option<&mut dyn ::starbridge::Reflect> {
                match index {
                    #(#setters)*
                    _ => ::std::option::Option::None,
                }
            }
        }
    };

    Ok(TokenStream::from(expanded))
}

/// Collects `#[star("directive")]` and `#[star(embed)]`, in any combination.
fn parse_star_attrs(attrs: &[Attribute]) -> Result<StarAttrs, syn::Error> {
    let mut out = StarAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident("star") {
            continue;
        }
        attr.parse_args_with(|input: ParseStream| {
            while !input.is_empty() {
                if input.peek(LitStr) {
                    let lit: LitStr = input.parse()?;
                    if out.directive.is_some() {
                        return Err(syn::Error::new(lit.span(), "duplicate directive"));
                    }
                    out.directive = Some(lit);
                } else {
                    let ident: Ident = input.parse()?;
                    if ident != "embed" {
                        return Err(syn::Error::new(
                            ident.span(),
                            format!(
                                "unknown star attribute `{ident}` \
                                 (expected a directive string or `embed`)"
                            ),
                        ));
                    }
                    out.embed = true;
                }
                if input.is_empty() {
                    break;
                }
                input.parse::<Token![,]>()?;
            }
            Ok(())
        })?;
    }
    Ok(out)
}
