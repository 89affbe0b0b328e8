//! System-prompt and user-message construction.
//!
//! The engine does the matching, so the prompt carries the entire customer
//! and item roster with exact ids, plus the workflow rules for the active
//! write mode.

use chrono::NaiveDate;

use orderly_core::catalog::CatalogIndex;
use orderly_core::config::WriteMode;
use orderly_core::domain::item::ItemVariant;
use orderly_core::domain::section::SheetSection;

pub fn build_system_prompt(catalog: &CatalogIndex, today: NaiveDate, mode: WriteMode) -> String {
    let customers = customer_roster(catalog);
    let items = item_roster(catalog);

    let mode_rules = match mode {
        WriteMode::Direct => {
            "These are AUTHORITATIVE orders from the ERP spreadsheet - create them directly.\n\
             \n\
             YOUR WORKFLOW:\n\
             1. Read ALL the spreadsheet rows provided\n\
             2. Group rows by customer - each customer's items for this delivery date form ONE order\n\
             3. For each customer:\n\
                a. Match the customer name to the CUSTOMERS list above (fuzzy match is OK)\n\
                b. Match each product to the ITEMS list above - use exact item IDs and variant IDs\n\
                c. Map the Size column to a variant code\n\
                d. Call get_existing_orders to check if an order already exists for this customer + delivery date\n\
                e. If an order ALREADY EXISTS -> SKIP this customer (do not create a duplicate)\n\
                f. If NO existing order -> call create_order with ALL items for this customer\n\
             4. Continue until ALL customers have been processed"
        }
        WriteMode::Review => {
            "Incoming orders become review proposals; nothing is applied until a person approves.\n\
             \n\
             YOUR WORKFLOW:\n\
             1. Read the order content\n\
             2. Identify the customer (match against the customer list above)\n\
             3. Match each ordered item to the catalog above - use the exact item IDs and variant IDs\n\
             4. Check if an existing order already exists for the delivery date (use get_existing_orders)\n\
             5. Call the appropriate tool:\n\
                - No existing order -> create_order\n\
                - Existing order + customer wants changes -> modify_order\n\
                - Existing order + customer wants to cancel -> cancel_order"
        }
    };

    format!(
        "You are the order intake agent for a microgreens grower.\n\
         You process standing produce orders for restaurant customers.\n\
         \n\
         CUSTOMERS:\n{customers}\n\
         \n\
         ITEMS & VARIANTS:\n{items}\n\
         \n\
         {mode_rules}\n\
         \n\
         RULES:\n\
         - Variants: S = Small, L = Large, T20 = Tray 20\n\
           \"small\" or \"S\" -> S variant, \"large\" or \"L\" -> L variant, \"tray\" or \"T20\" -> T20 variant\n\
         - If no size/variant is specified, default to S (Small)\n\
         - A single message may reference multiple delivery dates - call the tool separately for each\n\
         - Order frequency: \"weekly\", \"every week\", \"standing order\", \"recurring\", \"regular\", \
           \"same as usual\" -> \"recurring\"; otherwise -> \"one-time\"\n\
         - Today's date is {today}\n\
         - CRITICAL: All delivery dates MUST be today or in the future. When an order says \"Tuesday\" or \
           \"Friday\", calculate the NEXT occurrence that is AFTER today. Do NOT create orders for past dates.\n\
         \n\
         Be concise. Match, check existing orders, submit."
    )
}

fn customer_roster(catalog: &CatalogIndex) -> String {
    catalog
        .customers()
        .iter()
        .map(|customer| {
            let mut line = format!("  {} (id: {})", customer.name, customer.id.0);
            if let Some(email) = &customer.email {
                line.push_str(&format!(" email: {email}"));
            }
            if let Some(phone) = &customer.phone {
                line.push_str(&format!(" phone: {phone}"));
            }
            if let Some(notes) = &customer.notes {
                line.push_str(&format!(" -- {notes}"));
            }
            if !customer.item_notes.is_empty() {
                let notes = customer
                    .item_notes
                    .iter()
                    .map(|note| format!("{}: {}", note.item_name, note.note))
                    .collect::<Vec<_>>()
                    .join("; ");
                line.push_str(&format!(" | Item notes: {notes}"));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn item_roster(catalog: &CatalogIndex) -> String {
    catalog
        .items()
        .iter()
        .map(|item| {
            let mut variants: Vec<&ItemVariant> = item.variants.iter().collect();
            variants.sort_by(|a, b| a.variant_code.cmp(&b.variant_code));
            let variant_list = variants
                .iter()
                .map(|variant| {
                    format!(
                        "{}={} (id:{})",
                        variant.variant_code, variant.variant_name, variant.id.0
                    )
                })
                .collect::<Vec<_>>()
                .join(", ");

            format!(
                "  {} [SKU: {}] (id: {}) -> variants: {}",
                item.name, item.sku, item.id.0, variant_list
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a section as the pipe table the engine reads.
pub fn format_section(section: &SheetSection) -> String {
    let mut out = format!("DELIVERY DATE: {} ({})\n\n", section.raw_date, section.date);
    out.push_str("Customer | Product | Size | Qty\n");
    out.push_str(&"-".repeat(60));
    out.push('\n');
    for row in &section.rows {
        out.push_str(&format!(
            "{} | {} | {} | {}\n",
            row.customer, row.product, row.size, row.quantity
        ));
    }
    out
}

/// The opening user message for one date section's loop. Rows have already
/// been through the idempotency prefilter.
pub fn build_user_message(section: &SheetSection) -> String {
    format!(
        "Process ALL orders from this spreadsheet data. Create one order per customer.\n\
         \n\
         {data}\n\
         \n\
         Instructions:\n\
         - The delivery date for all orders is: {date}\n\
         - Process EVERY customer row. Do not skip any.\n\
         - For each customer, call create_order with ALL items for that customer.\n\
         - Group all items for the same customer into a single create_order call.\n\
         - These customers have been pre-verified to NOT have existing orders, so you can \
           create orders directly without checking first.",
        data = format_section(section),
        date = section.date,
    )
}
