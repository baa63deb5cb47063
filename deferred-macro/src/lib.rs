use proc_macro::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{parse_quote, Data, DeriveInput, Fields, Type};

/// Derive `Task` for an enum whose variants each wrap one task.
///
/// This is how several kinds of task share one scheduler: the enum is the
/// scheduler's task type, and `run` forwards to whichever variant is held.
///
/// # Examples
///
/// ## Generic over the context
///
/// ```ignore
/// use deferred::{Task, Scheduler};
/// use std::sync::atomic::{AtomicI64, Ordering};
///
/// struct Add(i64);
/// struct Reset;
///
/// impl Task<AtomicI64> for Add {
///     fn run(self, total: &AtomicI64, _at: i64) {
///         total.fetch_add(self.0, Ordering::SeqCst);
///     }
/// }
///
/// impl Task<AtomicI64> for Reset {
///     fn run(self, total: &AtomicI64, _at: i64) {
///         total.store(0, Ordering::SeqCst);
///     }
/// }
///
/// #[derive(Task)]
/// enum Counter {
///     Add(Add),
///     Reset(Reset),
/// }
///
/// let scheduler: Scheduler<Counter, AtomicI64> = Scheduler::new(AtomicI64::new(0));
/// scheduler.schedule_in(Counter::Add(Add(5)), 10).unwrap();
/// scheduler.schedule_in(Counter::Reset(Reset), 20).unwrap();
/// ```
///
/// ## Pinned to one context type
///
/// ```ignore
/// use deferred::Task;
///
/// struct Audit;
///
/// impl Task<String> for Audit {
///     fn run(self, service: &String, at: i64) {
///         println!("[{service}] audit due at {at}");
///     }
/// }
///
/// #[derive(Task)]
/// #[task(context = String)]
/// enum ServiceTask {
///     Audit(Audit),
/// }
/// ```
///
/// # Requirements
///
/// - Only enums are supported.
/// - Every variant holds exactly one field (tuple or named) implementing `Task`.
/// - `#[task(context = Type)]` is optional; without it the impl is generic
///   over any context all variants accept.
#[proc_macro_derive(Task, attributes(task))]
pub fn derive_task(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    match expand_task(input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(e) => TokenStream::from(e.to_compile_error()),
    }
}

fn expand_task(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let context = parse_task_args(&input)?;

    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new(
            input.ident.span(),
            "Task can only be derived for enums; implement Task by hand for structs",
        ));
    };

    let mut arms = Vec::new();
    let mut inner_types = Vec::new();
    for variant in &data.variants {
        let variant_name = &variant.ident;
        let field = match &variant.fields {
            Fields::Unnamed(fields) if fields.unnamed.len() == 1 => &fields.unnamed[0],
            Fields::Named(fields) if fields.named.len() == 1 => &fields.named[0],
            _ => {
                return Err(syn::Error::new(
                    variant.span(),
                    format!(
                        "variant `{}` must hold exactly one field implementing Task",
                        variant_name
                    ),
                ))
            }
        };

        let pattern = match &field.ident {
            Some(field_name) => quote!(Self::#variant_name { #field_name: inner }),
            None => quote!(Self::#variant_name(inner)),
        };
        arms.push(quote! {
            #pattern => ::deferred::deferred_runtime::Task::run(inner, ctx, scheduled_at),
        });
        inner_types.push(field.ty.clone());
    }

    let (_, ty_generics, _) = input.generics.split_for_impl();
    let mut generics = input.generics.clone();
    let context_ty: Type = match context {
        Some(ty) => ty,
        None => {
            generics.params.push(parse_quote!(__C));
            parse_quote!(__C)
        }
    };

    let where_clause = generics.make_where_clause();
    for ty in &inner_types {
        where_clause
            .predicates
            .push(parse_quote!(#ty: ::deferred::deferred_runtime::Task<#context_ty>));
    }
    where_clause
        .predicates
        .push(parse_quote!(#name #ty_generics: ::core::marker::Send + 'static));

    let (impl_generics, _, where_clause) = generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::deferred::deferred_runtime::Task<#context_ty> for #name #ty_generics
        #where_clause
        {
            fn run(self, ctx: &#context_ty, scheduled_at: i64) {
                match self {
                    #(#arms)*
                }
            }
        }
    })
}

/// Parse `#[task(context = Type)]`, returning the pinned context type if any.
fn parse_task_args(input: &DeriveInput) -> syn::Result<Option<Type>> {
    let mut context = None;
    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("task")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("context") {
                context = Some(meta.value()?.parse::<Type>()?);
                Ok(())
            } else {
                Err(meta.error("unsupported task attribute, expected `context = Type`"))
            }
        })?;
    }
    Ok(context)
}
