use crate::errors::ReportError;
use crate::handlers::report::{Element, ReportLayout, Rgb, PAGE_HEIGHT, PAGE_WIDTH};
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Point, Polygon,
};

const CELL_PADDING: f32 = 2.0;
const CELL_FONT_SIZE: f32 = 10.0;
const LAYER: &str = "Layer 1";

/// Renders a laid-out report with the built-in Helvetica font.
pub fn render_pdf(layout: &ReportLayout, title: &str) -> Result<Vec<u8>, ReportError> {
    let (doc, first_page, first_layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ReportError::Render(e.to_string()))?;

    for (index, page) in layout.pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_index, layer_index) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
            doc.get_page(page_index).get_layer(layer_index)
        };

        for element in &page.elements {
            draw(&layer, &font, element);
        }
    }

    doc.save_to_bytes()
        .map_err(|e| ReportError::Render(e.to_string()))
}

fn draw(layer: &PdfLayerReference, font: &IndirectFontRef, element: &Element) {
    match element {
        Element::Text {
            x,
            y,
            size,
            color,
            text,
        } => {
            layer.set_fill_color(rgb(*color));
            layer.use_text(text.as_str(), *size, Mm(*x), flip(*y), font);
        }
        Element::Cell {
            x,
            y,
            width,
            height,
            fill,
            color,
            text,
        } => {
            let (left, right) = (Mm(*x), Mm(x + width));
            let (top, bottom) = (flip(*y), flip(y + height));
            let ring = vec![
                (Point::new(left, top), false),
                (Point::new(right, top), false),
                (Point::new(right, bottom), false),
                (Point::new(left, bottom), false),
            ];

            layer.set_outline_color(rgb(Rgb(200, 200, 200)));
            layer.set_outline_thickness(0.5);
            let mode = match fill {
                Some(fill) => {
                    layer.set_fill_color(rgb(*fill));
                    PaintMode::FillStroke
                }
                None => PaintMode::Stroke,
            };
            layer.add_polygon(Polygon {
                rings: vec![ring],
                mode,
                winding_order: WindingOrder::NonZero,
            });

            // baseline sits a little above the bottom edge
            layer.set_fill_color(rgb(*color));
            layer.use_text(
                text.as_str(),
                CELL_FONT_SIZE,
                Mm(x + CELL_PADDING),
                flip(y + height - 2.5),
                font,
            );
        }
    }
}

/// Layout y grows downwards, PDF y grows upwards.
fn flip(y: f32) -> Mm {
    Mm(PAGE_HEIGHT - y)
}

fn rgb(Rgb(r, g, b): Rgb) -> Color {
    Color::Rgb(printpdf::Rgb::new(
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
        None,
    ))
}
