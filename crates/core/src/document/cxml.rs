//! cXML `OrderRequest` writer.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::orders::{EnrichedOrder, LineItem, ShippingAddress};

use super::chunk::{chunk_text, ADDRESS_LINE_WIDTH};
use super::DocumentError;

/// Values that are constant across a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentOptions {
    /// Value of the `Issuing Office` header extrinsic.
    pub issuing_office: String,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            issuing_office: "Amazon".to_string(),
        }
    }
}

/// Renders one enriched order as a cXML document.
///
/// Missing or blank fields are written as empty elements, never as a
/// placeholder string. Line items are numbered from 1 in input order.
pub fn render_order_document(
    order: &EnrichedOrder,
    options: &DocumentOptions,
) -> Result<String, DocumentError> {
    let mut doc = DocWriter::new();

    doc.emit(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    doc.open("cXML", &[("xml:lang", "en_US"), ("version", "1.0")])?;

    doc.open("Header", &[])?;
    doc.empty("From", &[])?;
    doc.empty("To", &[])?;
    doc.open("Sender", &[])?;
    doc.text("UserAgent", &[], "default")?;
    doc.close("Sender")?;
    doc.close("Header")?;

    doc.open("Request", &[])?;
    doc.open("OrderRequest", &[])?;
    write_header(&mut doc, order, options)?;
    for (index, item) in order.line_items.iter().enumerate() {
        write_item(&mut doc, index + 1, item)?;
    }
    doc.close("OrderRequest")?;
    doc.close("Request")?;

    doc.close("cXML")?;
    doc.finish()
}

fn write_header(
    doc: &mut DocWriter,
    order: &EnrichedOrder,
    options: &DocumentOptions,
) -> Result<(), DocumentError> {
    let address = &order.order.shipping_address;

    doc.open(
        "OrderRequestHeader",
        &[("agreementID", ""), ("type", "new"), ("orderID", order.id())],
    )?;
    doc.empty("Total", &[])?;

    doc.open("ShipTo", &[])?;
    doc.open("Address", &[("addressID", "01"), ("isoCountryCode", "US")])?;
    doc.text("Name", &[("xml:lang", "en")], field(&address.name))?;
    write_postal_address(doc, address)?;
    doc.close("Address")?;
    doc.close("ShipTo")?;

    doc.open("Payment", &[])?;
    doc.text("Extrinsic", &[("name", "Card Type")], "X")?;
    doc.empty(
        "PCard",
        &[("name", "X"), ("expiration", "XXXX-01-01"), ("number", "X")],
    )?;
    doc.close("Payment")?;

    doc.open("Contact", &[])?;
    doc.text("Name", &[("xml:lang", "en")], field(&order.order.buyer_name))?;
    doc.close("Contact")?;

    doc.text("Comments", &[], field(&address.phone))?;

    doc.text(
        "Extrinsic",
        &[("name", "Issuing Office")],
        &options.issuing_office,
    )?;
    doc.text("Extrinsic", &[("name", "Requisition Office")], "Sales Order")?;
    doc.empty("Extrinsic", &[("name", "Accounting and Appropriation")])?;
    doc.empty("Extrinsic", &[("name", "Note")])?;

    doc.close("OrderRequestHeader")
}

fn write_postal_address(doc: &mut DocWriter, address: &ShippingAddress) -> Result<(), DocumentError> {
    doc.open("PostalAddress", &[("name", "default")])?;

    doc.text("DeliverTo", &[], field(&address.address_line1))?;

    let streets: Vec<String> = [&address.address_line2, &address.address_line3]
        .into_iter()
        .flat_map(|line| chunk_text(field(line), ADDRESS_LINE_WIDTH))
        .collect();
    if streets.is_empty() {
        doc.empty("Street", &[])?;
    }
    for street in &streets {
        doc.text("Street", &[], street)?;
    }

    doc.text("City", &[], field(&address.city))?;
    doc.text("State", &[], field(&address.state_or_region))?;
    doc.text("PostalCode", &[], field(&address.postal_code))?;
    doc.empty(
        "Country",
        &[("isoCountryCode", field(&address.country_code))],
    )?;

    doc.close("PostalAddress")
}

fn write_item(doc: &mut DocWriter, line_number: usize, item: &LineItem) -> Result<(), DocumentError> {
    let line_number = line_number.to_string();
    let quantity = item.quantity_ordered.to_string();

    doc.open(
        "ItemOut",
        &[("lineNumber", &line_number), ("quantity", &quantity)],
    )?;

    doc.open("ItemID", &[])?;
    doc.text("SupplierPartID", &[], &item.sku)?;
    doc.close("ItemID")?;

    doc.open("ItemDetail", &[])?;
    doc.open("UnitPrice", &[])?;
    doc.text(
        "Money",
        &[("currency", item.unit_price.currency.as_str())],
        &item.unit_price.amount,
    )?;
    doc.close("UnitPrice")?;
    doc.text("Description", &[("xml:lang", "en")], &item.title)?;
    doc.text("UnitOfMeasure", &[], "EA")?;
    doc.empty("ManufacturerPartID", &[])?;
    doc.empty("ManufacturerName", &[])?;
    doc.close("ItemDetail")?;

    doc.close("ItemOut")
}

/// The value as given, or `""` when it is absent or only whitespace.
fn field(value: &Option<String>) -> &str {
    match value.as_deref() {
        Some(text) if !text.trim().is_empty() => text,
        _ => "",
    }
}

/// Thin wrapper over the quick-xml writer so every call site shares one
/// error mapping.
struct DocWriter {
    inner: Writer<Vec<u8>>,
}

impl DocWriter {
    fn new() -> Self {
        Self {
            inner: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn emit(&mut self, event: Event<'_>) -> Result<(), DocumentError> {
        self.inner
            .write_event(event)
            .map_err(|e| DocumentError::Xml(e.to_string()))
    }

    fn start<'a>(name: &'a str, attrs: &[(&'a str, &'a str)]) -> BytesStart<'a> {
        let mut start = BytesStart::new(name);
        for attr in attrs {
            start.push_attribute(*attr);
        }
        start
    }

    fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), DocumentError> {
        self.emit(Event::Start(Self::start(name, attrs)))
    }

    fn close(&mut self, name: &str) -> Result<(), DocumentError> {
        self.emit(Event::End(BytesEnd::new(name)))
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), DocumentError> {
        self.emit(Event::Empty(Self::start(name, attrs)))
    }

    fn text(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> Result<(), DocumentError> {
        if text.is_empty() {
            return self.empty(name, attrs);
        }
        self.open(name, attrs)?;
        self.emit(Event::Text(BytesText::new(text)))?;
        self.close(name)
    }

    fn finish(self) -> Result<String, DocumentError> {
        let mut bytes = self.inner.into_inner();
        bytes.push(b'\n');
        Ok(String::from_utf8(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::{Money, Order};
    use crate::orders::xml_to_value;

    fn sample_order() -> EnrichedOrder {
        Order {
            id: "113-0000001-0000001".to_string(),
            buyer_name: Some("Ada Lovelace".to_string()),
            shipping_address: ShippingAddress {
                name: Some("Ada Lovelace".to_string()),
                address_line1: Some("Analytical Engines Ltd".to_string()),
                address_line2: Some("12 St James's Square".to_string()),
                address_line3: None,
                city: Some("Seattle".to_string()),
                state_or_region: Some("WA".to_string()),
                postal_code: Some("98101".to_string()),
                country_code: Some("US".to_string()),
                phone: Some("555-0100".to_string()),
            },
        }
        .with_line_items(vec![
            LineItem {
                sku: "SKU-1".to_string(),
                title: "Punch cards".to_string(),
                quantity_ordered: 2,
                unit_price: Money {
                    currency: "USD".to_string(),
                    amount: "9.99".to_string(),
                },
            },
            LineItem {
                sku: "SKU-2".to_string(),
                title: "Brass gears".to_string(),
                quantity_ordered: 1,
                unit_price: Money {
                    currency: "USD".to_string(),
                    amount: "120.00".to_string(),
                },
            },
        ])
    }

    fn render(order: &EnrichedOrder) -> String {
        render_order_document(order, &DocumentOptions::default()).unwrap()
    }

    #[test]
    fn test_document_structure() {
        let xml = render(&sample_order());

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<cXML xml:lang=\"en_US\" version=\"1.0\">"));
        assert!(xml.contains("<UserAgent>default</UserAgent>"));
        assert!(xml.contains(
            "<OrderRequestHeader agreementID=\"\" type=\"new\" orderID=\"113-0000001-0000001\">"
        ));
        assert!(xml.contains("<Address addressID=\"01\" isoCountryCode=\"US\">"));
        assert!(xml.contains("<DeliverTo>Analytical Engines Ltd</DeliverTo>"));
        assert!(xml.contains("<Country isoCountryCode=\"US\"/>"));
        assert!(xml.contains("<PCard name=\"X\" expiration=\"XXXX-01-01\" number=\"X\"/>"));
        assert!(xml.contains("<Comments>555-0100</Comments>"));
        assert!(xml.contains("<Extrinsic name=\"Issuing Office\">Amazon</Extrinsic>"));
        assert!(xml.contains("<Extrinsic name=\"Requisition Office\">Sales Order</Extrinsic>"));
        assert!(xml.contains("<Extrinsic name=\"Note\"/>"));
    }

    #[test]
    fn test_line_items_numbered_from_one() {
        let xml = render(&sample_order());

        let first = xml.find("<ItemOut lineNumber=\"1\" quantity=\"2\">").unwrap();
        let second = xml.find("<ItemOut lineNumber=\"2\" quantity=\"1\">").unwrap();
        assert!(first < second);
        assert!(xml.contains("<SupplierPartID>SKU-1</SupplierPartID>"));
        assert!(xml.contains("<Money currency=\"USD\">120.00</Money>"));
        assert_eq!(xml.matches("<UnitOfMeasure>EA</UnitOfMeasure>").count(), 2);
        assert!(!xml.contains("lineNumber=\"0\""));
    }

    #[test]
    fn test_user_fields_are_escaped() {
        let mut order = sample_order();
        order.order.buyer_name = Some("Tom & Jerry <Cartoons>".to_string());
        order.line_items[0].title = "5\" gauge \"rails\" & <ties>".to_string();
        order.order.id = "113-\"quoted\"".to_string();

        let xml = render(&order);

        assert!(xml.contains("Tom &amp; Jerry &lt;Cartoons&gt;"));
        assert!(xml.contains("&amp; &lt;ties&gt;"));
        assert!(xml.contains("orderID=\"113-&quot;quoted&quot;\""));
        assert!(!xml.contains("<Cartoons>"));

        // Still well-formed after escaping.
        assert!(xml_to_value(&xml).is_ok());
    }

    #[test]
    fn test_missing_fields_render_empty() {
        let order = Order {
            id: "113-0000002-0000002".to_string(),
            buyer_name: None,
            shipping_address: ShippingAddress {
                city: Some("   ".to_string()),
                ..ShippingAddress::default()
            },
        }
        .with_line_items(vec![]);

        let xml = render(&order);

        assert!(xml.contains("<City/>"));
        assert!(xml.contains("<DeliverTo/>"));
        assert!(xml.contains("<Street/>"));
        assert!(xml.contains("<Comments/>"));
        assert!(xml.contains("<Country isoCountryCode=\"\"/>"));
        assert!(!xml.contains("null"));
        assert!(!xml.contains("undefined"));
        assert!(!xml.contains("<ItemOut"));
    }

    #[test]
    fn test_long_street_lines_split_into_chunks() {
        let mut order = sample_order();
        order.order.shipping_address.address_line2 =
            Some("Building 7, Suite 1200, Attn: Receiving Department".to_string());
        order.order.shipping_address.address_line3 = Some("Dock 4".to_string());

        let xml = render(&order);

        let streets: Vec<&str> = xml
            .lines()
            .map(str::trim)
            .filter(|l| l.starts_with("<Street>"))
            .collect();
        assert_eq!(
            streets,
            vec![
                "<Street>Building 7, Suite 1200, Attn: </Street>",
                "<Street>Receiving Department</Street>",
                "<Street>Dock 4</Street>",
            ]
        );
    }

    #[test]
    fn test_address_text_keeps_surrounding_spaces() {
        let mut order = sample_order();
        order.order.shipping_address.address_line2 = Some("  Unit 5 ".to_string());
        order.order.shipping_address.city = Some(" Seattle".to_string());

        let xml = render(&order);

        assert!(xml.contains("<Street>  Unit 5 </Street>"));
        assert!(xml.contains("<City> Seattle</City>"));
    }

    #[test]
    fn test_issuing_office_is_configurable() {
        let options = DocumentOptions {
            issuing_office: "Marketplace East".to_string(),
        };
        let xml = render_order_document(&sample_order(), &options).unwrap();
        assert!(xml.contains("<Extrinsic name=\"Issuing Office\">Marketplace East</Extrinsic>"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let order = sample_order();
        assert_eq!(render(&order), render(&order));
    }
}
