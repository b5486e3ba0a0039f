use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, Ident, LitStr, Type, parse_macro_input, spanned::Spanned};

const HOOK_NAMES: [&str; 7] = [
    "pre_insert",
    "post_insert",
    "pre_update",
    "post_update",
    "pre_delete",
    "post_delete",
    "post_get",
];

#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_record(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
struct RecordOptions {
    type_name: Option<String>,
    hooks: Option<Vec<Ident>>,
}

#[derive(Default)]
struct FieldOptions {
    column: Option<String>,
    skip: bool,
}

struct MappedField {
    ident: Ident,
    ty: Type,
    column: Option<String>,
}

fn expand_record(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = input.ident.clone();

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "Record does not support generic structs yet",
        ));
    }

    let data = match &input.data {
        Data::Struct(data) => data,
        _ => {
            return Err(syn::Error::new(
                input.span(),
                "Record can only be derived for structs",
            ));
        }
    };

    let named = match &data.fields {
        Fields::Named(named) => named,
        _ => {
            return Err(syn::Error::new(
                data.fields.span(),
                "Record requires a struct with named fields",
            ));
        }
    };

    let options = parse_record_options(&input.attrs)?;

    let mut fields = Vec::new();
    for field in &named.named {
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let field_options = parse_field_options(&field.attrs)?;
        if field_options.skip {
            continue;
        }
        fields.push(MappedField {
            ident,
            ty: field.ty.clone(),
            column: field_options.column,
        });
    }

    if fields.is_empty() {
        return Err(syn::Error::new(
            struct_name.span(),
            "Record requires at least one mapped field",
        ));
    }

    let type_name = options
        .type_name
        .clone()
        .unwrap_or_else(|| struct_name.to_string());

    let field_defs = fields.iter().map(|f| {
        let name = f.ident.to_string();
        let ty = &f.ty;
        let column = match &f.column {
            Some(column) => quote! { ::core::option::Option::Some(#column) },
            None => quote! { ::core::option::Option::None },
        };
        quote! {
            ::rustmapper::FieldDef::new(
                #name,
                #column,
                <#ty as ::rustmapper::FieldValue>::KIND,
            )
        }
    });
    let field_count = fields.len();

    let get_arms = fields.iter().map(|f| {
        let ident = &f.ident;
        let name = ident.to_string();
        quote! {
            #name => ::core::option::Option::Some(::rustmapper::FieldValue::to_value(&self.#ident)),
        }
    });

    let set_arms = fields.iter().map(|f| {
        let ident = &f.ident;
        let name = ident.to_string();
        quote! {
            #name => {
                self.#ident = ::rustmapper::FieldValue::from_value(value)?;
                ::core::result::Result::Ok(())
            }
        }
    });

    let (hook_set_fn, hooks_impl) = match &options.hooks {
        Some(hooks) => {
            let consts = hooks.iter().map(|hook| {
                let upper = format_ident!("{}", hook.to_string().to_uppercase());
                quote! { .union(::rustmapper::HookSet::#upper) }
            });
            (
                quote! {
                    fn hook_set() -> ::rustmapper::HookSet {
                        ::rustmapper::HookSet::NONE #(#consts)*
                    }
                },
                quote! {},
            )
        }
        None => (
            quote! {},
            quote! {
                impl ::rustmapper::Hooks for #struct_name {}
            },
        ),
    };

    Ok(quote! {
        impl ::rustmapper::Entity for #struct_name {
            fn type_name() -> &'static str {
                #type_name
            }

            fn field_defs() -> &'static [::rustmapper::FieldDef] {
                const FIELDS: [::rustmapper::FieldDef; #field_count] = [#(#field_defs),*];
                &FIELDS
            }

            #hook_set_fn
        }

        impl ::rustmapper::Record for #struct_name {
            fn fields(&self) -> &'static [::rustmapper::FieldDef] {
                <Self as ::rustmapper::Entity>::field_defs()
            }

            fn get(&self, field: &str) -> ::core::option::Option<::rustmapper::Value> {
                match field {
                    #(#get_arms)*
                    _ => ::core::option::Option::None,
                }
            }

            fn set(&mut self, field: &str, value: ::rustmapper::Value) -> ::rustmapper::Result<()> {
                match field {
                    #(#set_arms)*
                    _ => ::core::result::Result::Err(::rustmapper::DbError::UnknownField {
                        type_name: #type_name.to_string(),
                        field: field.to_string(),
                    }),
                }
            }

            fn record_type_name(&self) -> &'static str {
                #type_name
            }
        }

        #hooks_impl
    })
}

fn parse_record_options(attrs: &[syn::Attribute]) -> syn::Result<RecordOptions> {
    let mut options = RecordOptions::default();

    for attr in attrs {
        if !attr.path().is_ident("record") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                options.type_name = Some(lit.value());
                return Ok(());
            }

            if meta.path.is_ident("hooks") {
                let hooks = options.hooks.get_or_insert_with(Vec::new);
                meta.parse_nested_meta(|hook| {
                    let Some(ident) = hook.path.get_ident() else {
                        return Err(hook.error("expected a hook name"));
                    };
                    if !HOOK_NAMES.contains(&ident.to_string().as_str()) {
                        return Err(hook.error(format!(
                            "Unknown hook `{}`. Supported: {}",
                            ident,
                            HOOK_NAMES.join(", ")
                        )));
                    }
                    if !hooks.iter().any(|h| h == ident) {
                        hooks.push(ident.clone());
                    }
                    Ok(())
                })?;
                return Ok(());
            }

            Err(meta.error(
                "Unsupported #[record(...)] option. Supported: name = \"...\", hooks(...)",
            ))
        })?;
    }

    Ok(options)
}

fn parse_field_options(attrs: &[syn::Attribute]) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions::default();

    for attr in attrs {
        if !attr.path().is_ident("record") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                options.skip = true;
                return Ok(());
            }

            if meta.path.is_ident("column") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                if lit.value().is_empty() {
                    return Err(syn::Error::new(lit.span(), "column name cannot be empty"));
                }
                options.column = Some(lit.value());
                return Ok(());
            }

            Err(meta.error(
                "Unsupported #[record(...)] field option. Supported: skip, column = \"...\"",
            ))
        })?;

        if options.skip && options.column.is_some() {
            return Err(syn::Error::new(
                attr.span(),
                "#[record(skip)] cannot define a column name",
            ));
        }
    }

    Ok(options)
}
