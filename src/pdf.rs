//! A4 rendering of the monthly report.
//!
//! Layout is done by hand with the standard Helvetica fonts: a title, the
//! month heading, a two column table that continues on new pages when it
//! runs out of room, and the grand total and generation time below it.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, StringFormat, dictionary};

use crate::services::report::MonthlyReport;

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 36;

const NAME_COLUMN: i64 = 288;
const TOTAL_COLUMN: i64 = 144;
const TABLE_LEFT: i64 = (PAGE_WIDTH - NAME_COLUMN - TOTAL_COLUMN) / 2;
const HEADER_HEIGHT: i64 = 28;
const ROW_HEIGHT: i64 = 22;

const REGULAR: &str = "F1";
const BOLD: &str = "F2";

type Rgb = (f32, f32, f32);

const TITLE_COLOR: Rgb = (0.173, 0.243, 0.314);
const HEADING_COLOR: Rgb = (0.204, 0.286, 0.369);
const HEADER_FILL: Rgb = (0.204, 0.596, 0.859);
const STRIPE_FILL: Rgb = (0.973, 0.976, 0.980);
const WHITE: Rgb = (1.0, 1.0, 1.0);
const BLACK: Rgb = (0.0, 0.0, 0.0);
const GREY: Rgb = (0.5, 0.5, 0.5);

#[derive(Clone, Copy)]
struct Style {
    font: &'static str,
    size: i64,
    color: Rgb,
}

const TITLE: Style = Style { font: BOLD, size: 24, color: TITLE_COLOR };
const HEADING: Style = Style { font: BOLD, size: 16, color: HEADING_COLOR };
const TABLE_HEADER: Style = Style { font: BOLD, size: 14, color: WHITE };
const TABLE_BODY: Style = Style { font: REGULAR, size: 12, color: BLACK };
const TOTAL: Style = Style { font: BOLD, size: 12, color: BLACK };
const FOOTER: Style = Style { font: REGULAR, size: 9, color: GREY };

pub fn render_report(report: &MonthlyReport) -> Result<Vec<u8>, lopdf::Error> {
    let mut pages = PageWriter::new();

    pages.centered_text(TITLE, &report.organization);
    pages.advance(48);
    pages.text(HEADING, TABLE_LEFT, &report.heading());
    pages.advance(36);

    pages.table_header();
    for (index, row) in report.rows.iter().enumerate() {
        if !pages.fits(ROW_HEIGHT) {
            pages.new_page();
            pages.table_header();
        }
        pages.table_row(index, &row.name, &row.total.to_string());
    }

    if !pages.fits(64) {
        pages.new_page();
    }
    pages.advance(28);
    let grand_total = format!("Grand Total: {} meals", report.grand_total);
    pages.text(TOTAL, TABLE_LEFT, &grand_total);
    pages.advance(22);
    let generated = format!(
        "Generated on: {}",
        report.generated_at.format("%Y-%m-%d %H:%M:%S")
    );
    pages.text(FOOTER, TABLE_LEFT, &generated);

    build_document(pages.finish())
}

fn build_document(pages: Vec<Vec<Operation>>) -> Result<Vec<u8>, lopdf::Error> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(font("Helvetica"));
    let bold_id = doc.add_object(font("Helvetica-Bold"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            REGULAR => regular_id,
            BOLD => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let page_tree = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(PAGE_WIDTH),
            Object::Integer(PAGE_HEIGHT),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(page_tree));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

fn font(base: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Collects drawing operations page by page, tracking the baseline `y`.
struct PageWriter {
    done: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    y: i64,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            done: Vec::new(),
            current: Vec::new(),
            y: PAGE_HEIGHT - MARGIN - 24,
        }
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        self.done.push(self.current);
        self.done
    }

    fn new_page(&mut self) {
        let page = std::mem::take(&mut self.current);
        self.done.push(page);
        self.y = PAGE_HEIGHT - MARGIN - ROW_HEIGHT;
    }

    fn fits(&self, height: i64) -> bool {
        self.y - height >= MARGIN
    }

    fn advance(&mut self, height: i64) {
        self.y -= height;
    }

    fn text(&mut self, style: Style, x: i64, text: &str) {
        let y = self.y;
        self.text_at(style, x, y, text);
    }

    fn centered_text(&mut self, style: Style, text: &str) {
        let x = (PAGE_WIDTH - estimated_width(text, style.size)) / 2;
        self.text(style, x.max(MARGIN), text);
    }

    fn text_at(&mut self, style: Style, x: i64, y: i64, text: &str) {
        self.current.extend([
            Operation::new("BT", vec![]),
            fill_color(style.color),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(style.font.as_bytes().to_vec()),
                    Object::Integer(style.size),
                ],
            ),
            Operation::new("Td", vec![Object::Integer(x), Object::Integer(y)]),
            Operation::new("Tj", vec![Object::String(encode_text(text), StringFormat::Literal)]),
            Operation::new("ET", vec![]),
        ]);
    }

    fn cell(&mut self, x: i64, width: i64, height: i64, fill: Rgb) {
        let y = self.y - height;
        self.current.extend([
            Operation::new("q", vec![]),
            fill_color(fill),
            rect(x, y, width, height),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
            Operation::new("w", vec![Object::Integer(1)]),
            rect(x, y, width, height),
            Operation::new("S", vec![]),
        ]);
    }

    fn cell_text(&mut self, style: Style, x: i64, width: i64, height: i64, text: &str) {
        let text_x = x + (width - estimated_width(text, style.size)) / 2;
        let text_y = self.y - height + (height - style.size) / 2 + 2;
        self.text_at(style, text_x.max(x + 4), text_y, text);
    }

    fn table_header(&mut self) {
        self.row(HEADER_HEIGHT, HEADER_FILL, TABLE_HEADER, "Member Name", "Total Meals");
    }

    fn table_row(&mut self, index: usize, name: &str, total: &str) {
        let fill = if index % 2 == 0 { WHITE } else { STRIPE_FILL };
        self.row(ROW_HEIGHT, fill, TABLE_BODY, name, total);
    }

    fn row(&mut self, height: i64, fill: Rgb, style: Style, name: &str, total: &str) {
        let total_x = TABLE_LEFT + NAME_COLUMN;
        self.cell(TABLE_LEFT, NAME_COLUMN, height, fill);
        self.cell(total_x, TOTAL_COLUMN, height, fill);
        self.cell_text(style, TABLE_LEFT, NAME_COLUMN, height, name);
        self.cell_text(style, total_x, TOTAL_COLUMN, height, total);
        self.advance(height);
    }
}

fn fill_color((r, g, b): Rgb) -> Operation {
    Operation::new("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)])
}

fn rect(x: i64, y: i64, width: i64, height: i64) -> Operation {
    Operation::new(
        "re",
        vec![
            Object::Integer(x),
            Object::Integer(y),
            Object::Integer(width),
            Object::Integer(height),
        ],
    )
}

/// Rough Helvetica advance width, enough for centering.
fn estimated_width(text: &str, size: i64) -> i64 {
    text.chars().count() as i64 * size * 11 / 20
}

/// Latin-1 bytes for the WinAnsi fonts; anything outside it becomes `?`.
fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}
