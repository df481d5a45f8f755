// src/services/export_service.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{inventory_repo::RowLimit, CashRepository, InventoryRepository, SalesRepository},
    models::{
        cash::CashMovement,
        inventory::{Product, StockMovement, StockMovementFilter},
        sales::{Sale, SaleFilter},
    },
};

// BOM para o Excel abrir acentos corretamente
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Planilhas em CSV no formato do Excel brasileiro (`;` e vírgula decimal).
#[derive(Clone)]
pub struct ExportService {
    inventory_repo: InventoryRepository,
    sales_repo: SalesRepository,
    cash_repo: CashRepository,
}

impl ExportService {
    pub fn new(
        inventory_repo: InventoryRepository,
        sales_repo: SalesRepository,
        cash_repo: CashRepository,
    ) -> Self {
        Self { inventory_repo, sales_repo, cash_repo }
    }

    pub async fn products_csv<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<u8>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let products = self.inventory_repo.list_products(executor, tenant_id, None, false).await?;
        products_to_csv(&products)
    }

    pub async fn sales_csv<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        filter: &SaleFilter,
    ) -> Result<Vec<u8>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sales = self.sales_repo.list_sales(executor, tenant_id, filter, RowLimit::Unbounded).await?;
        sales_to_csv(&sales)
    }

    pub async fn stock_movements_csv<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        filter: &StockMovementFilter,
    ) -> Result<Vec<u8>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres, Connection = &'e mut PgConnection>,
    {
        let mut conn = executor.acquire().await?;
        let movements = self.inventory_repo
            .list_stock_movements(&mut *conn, tenant_id, filter, RowLimit::Unbounded)
            .await?;
        let names: HashMap<Uuid, String> = self.inventory_repo
            .list_products(&mut *conn, tenant_id, None, false)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        stock_movements_to_csv(&movements, &names)
    }

    pub async fn cash_movements_csv<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        session_id: Uuid,
    ) -> Result<Vec<u8>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres, Connection = &'e mut PgConnection>,
    {
        let mut conn = executor.acquire().await?;
        self.cash_repo
            .get_session(&mut *conn, tenant_id, session_id)
            .await?
            .ok_or(AppError::NotFound("cash_session"))?;
        let movements = self.cash_repo.list_movements(&mut *conn, tenant_id, session_id).await?;
        cash_movements_to_csv(&movements)
    }
}

/// Cabeçalho + uma linha por registro. Campos com `;`, aspas ou quebra de
/// linha saem entre aspas, com as aspas internas duplicadas.
fn write_csv<I>(header: &[&str], rows: I) -> Result<Vec<u8>, AppError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut buffer = UTF8_BOM.to_vec();
    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .terminator(csv::Terminator::Any(b'\n'))
            .quote_style(csv::QuoteStyle::Necessary)
            .from_writer(&mut buffer);

        writer.write_record(header)?;
        for row in rows {
            writer.write_record(&row)?;
        }
        writer.flush().map_err(csv::Error::from)?;
    }
    Ok(buffer)
}

fn decimal(value: Decimal) -> String {
    value.to_string().replace('.', ",")
}

fn datetime(value: DateTime<Utc>) -> String {
    value.format("%d/%m/%Y %H:%M").to_string()
}

fn products_to_csv(products: &[Product]) -> Result<Vec<u8>, AppError> {
    write_csv(
        &[
            "SKU", "Código de barras", "Nome", "Categoria", "Custo", "Preço",
            "Estoque", "Estoque mínimo", "Estoque baixo", "Ativo",
        ],
        products.iter().map(|p| {
            vec![
                p.sku.clone(),
                p.barcode.clone().unwrap_or_default(),
                p.name.clone(),
                p.category.clone().unwrap_or_default(),
                decimal(p.cost_price),
                decimal(p.sale_price),
                decimal(p.current_stock),
                decimal(p.min_stock),
                yes_no(p.is_low_stock()),
                yes_no(p.active),
            ]
        }),
    )
}

fn yes_no(value: bool) -> String {
    if value { "Sim" } else { "Não" }.to_string()
}

fn sales_to_csv(sales: &[Sale]) -> Result<Vec<u8>, AppError> {
    write_csv(
        &["Venda", "Data", "Cliente", "Subtotal", "Desconto", "Total", "Pagamento", "Status"],
        sales.iter().map(|s| {
            vec![
                s.display_id.to_string(),
                datetime(s.created_at),
                s.customer_name.clone().unwrap_or_default(),
                decimal(s.subtotal),
                decimal(s.discount),
                decimal(s.total),
                s.payment_method.label().to_string(),
                s.status.label().to_string(),
            ]
        }),
    )
}

fn stock_movements_to_csv(
    movements: &[StockMovement],
    product_names: &HashMap<Uuid, String>,
) -> Result<Vec<u8>, AppError> {
    write_csv(
        &["Data", "Produto", "Tipo", "Quantidade", "Saldo anterior", "Saldo posterior", "Motivo"],
        movements.iter().map(|m| {
            vec![
                datetime(m.created_at),
                product_names.get(&m.product_id).cloned().unwrap_or_default(),
                m.kind.label().to_string(),
                decimal(m.quantity),
                decimal(m.balance_before),
                decimal(m.balance_after),
                m.reason.clone().unwrap_or_default(),
            ]
        }),
    )
}

fn cash_movements_to_csv(movements: &[CashMovement]) -> Result<Vec<u8>, AppError> {
    write_csv(
        &["Data", "Categoria", "Descrição", "Pagamento", "Valor"],
        movements.iter().map(|m| {
            vec![
                datetime(m.created_at),
                m.category.label().to_string(),
                m.description.clone().unwrap_or_default(),
                m.payment_method.map(|p| p.label()).unwrap_or_default().to_string(),
                decimal(m.amount),
            ]
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::cash::{CashMovementCategory, PaymentMethod};

    fn body(bytes: &[u8]) -> &str {
        assert!(bytes.starts_with(UTF8_BOM));
        std::str::from_utf8(&bytes[UTF8_BOM.len()..]).unwrap()
    }

    fn movement(category: CashMovementCategory, amount: &str, description: &str) -> CashMovement {
        CashMovement {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            session_id: Uuid::nil(),
            category,
            amount: amount.parse().unwrap(),
            description: Some(description.into()),
            payment_method: None,
            sale_id: None,
            service_order_id: None,
            user_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn n_rows_produce_n_plus_one_lines() {
        let movements = vec![
            movement(CashMovementCategory::Supply, "50.00", "Troco extra"),
            movement(CashMovementCategory::Withdrawal, "-20.00", "Sangria"),
            movement(CashMovementCategory::Sale, "35.90", "Venda #3"),
        ];
        let bytes = cash_movements_to_csv(&movements).unwrap();
        let text = body(&bytes);

        assert_eq!(text.lines().count(), 4);
        assert_eq!(text.lines().next(), Some("Data;Categoria;Descrição;Pagamento;Valor"));
        assert!(text.lines().nth(2).unwrap().ends_with(";Sangria;Sangria;;-20,00"));
    }

    #[test]
    fn fields_with_separator_or_quotes_are_quoted() {
        let mut m = movement(CashMovementCategory::Sale, "10.00", r#"Capa "slim"; azul"#);
        m.payment_method = Some(PaymentMethod::Pix);
        let bytes = cash_movements_to_csv(&[m]).unwrap();
        let line = body(&bytes).lines().nth(1).unwrap().to_string();

        assert!(line.contains(r#";"Capa ""slim""; azul";PIX;10,00"#), "{line}");
    }

    #[test]
    fn multiline_fields_are_quoted() {
        let bytes = write_csv(&["a", "b"], vec![vec!["linha 1\nlinha 2".to_string(), "x".to_string()]])
            .unwrap();
        assert_eq!(body(&bytes), "a;b\n\"linha 1\nlinha 2\";x\n");
    }

    #[test]
    fn sales_export_is_not_cut_at_the_listing_page_size() {
        use crate::models::sales::SaleStatus;

        let sales: Vec<Sale> = (1..=250)
            .map(|n| Sale {
                id: Uuid::new_v4(),
                tenant_id: Uuid::nil(),
                display_id: n,
                session_id: Uuid::nil(),
                customer_name: None,
                subtotal: Decimal::from(10),
                discount: Decimal::ZERO,
                total: Decimal::from(10),
                payment_method: PaymentMethod::Cash,
                status: SaleStatus::Completed,
                user_id: None,
                created_at: Utc::now(),
                cancelled_at: None,
            })
            .collect();

        // A exportação não pagina: a consulta vai sem LIMIT
        assert_eq!(RowLimit::Unbounded.as_sql(), None);
        let bytes = sales_to_csv(&sales).unwrap();
        let text = body(&bytes);
        assert_eq!(text.lines().count(), 251);
        assert!(text.lines().last().unwrap().starts_with("250;"));
    }

    #[test]
    fn products_at_or_below_minimum_are_flagged_low_stock() {
        let product = |sku: &str, stock: i64| Product {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            sku: sku.into(),
            barcode: None,
            name: "Cabo USB-C".into(),
            description: None,
            category: None,
            cost_price: Decimal::from(8),
            sale_price: Decimal::from(25),
            current_stock: Decimal::from(stock),
            min_stock: Decimal::from(3),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let bytes = products_to_csv(&[product("CABO-1", 3), product("CABO-2", 10)]).unwrap();
        let lines: Vec<&str> = body(&bytes).lines().collect();

        assert!(lines[0].ends_with(";Estoque baixo;Ativo"));
        assert!(lines[1].starts_with("CABO-1;") && lines[1].ends_with(";Sim;Sim"), "{}", lines[1]);
        assert!(lines[2].ends_with(";Não;Sim"), "{}", lines[2]);
    }

    #[test]
    fn empty_export_has_only_the_header() {
        let bytes = sales_to_csv(&[]).unwrap();
        assert_eq!(body(&bytes).lines().count(), 1);
    }
}
