use proc_macro2::Span;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, LitStr, Token};

/// Number of dot rows in one HD44780 character cell.
const GLYPH_ROWS: usize = 8;
/// Number of dot columns in one HD44780 character cell.
const GLYPH_COLUMNS: usize = 5;

/// A procedural macro that turns a drawn 5x8 character into the CGRAM bitmap of an HD44780 controller.
///
/// It takes exactly eight string literals, one per dot row from top to bottom. Each row has five
/// characters, the leftmost one being bit 4. `#` or `1` lights a dot, while ` `, `.` or `0` leaves it dark.
///
/// ```ignore
/// const DEGREE: [u8; 8] = glyph!(
///     " ##  ",
///     "#  # ",
///     "#  # ",
///     " ##  ",
///     "     ",
///     "     ",
///     "     ",
///     "     ",
/// );
/// ```
///
/// It expands to a plain `[u8; 8]` array literal, so it can be used in `const` items.
/// Malformed rows are reported at compile time, pointing at the offending literal.
#[proc_macro]
pub fn glyph(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let rows = parse_macro_input!(input with Punctuated::<LitStr, Token![,]>::parse_terminated);

    if rows.len() != GLYPH_ROWS {
        return syn::Error::new(
            Span::call_site(),
            format!("a glyph needs exactly {} rows, got {}", GLYPH_ROWS, rows.len()),
        )
        .to_compile_error()
        .into();
    }

    let mut bytes = Vec::with_capacity(GLYPH_ROWS);

    for row in rows.iter() {
        let pattern = row.value();
        if pattern.chars().count() != GLYPH_COLUMNS {
            return syn::Error::new(
                row.span(),
                format!("a glyph row needs exactly {} dots", GLYPH_COLUMNS),
            )
            .to_compile_error()
            .into();
        }

        let mut byte = 0u8;
        for dot in pattern.chars() {
            byte <<= 1;
            match dot {
                '#' | '1' => byte |= 1,
                ' ' | '.' | '0' => {}
                other => {
                    return syn::Error::new(
                        row.span(),
                        format!("invalid dot {:?}, use '#' or '1' for lit and ' ', '.' or '0' for dark", other),
                    )
                    .to_compile_error()
                    .into();
                }
            }
        }
        bytes.push(quote! { #byte });
    }

    quote!(
        [#(#bytes),*]
    ).into()
}
