// src/services/receipt_service.rs

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, money::format_brl},
    db::SettingsRepository,
    models::{
        cash::{CashSessionSummary, Reconciliation},
        sales::{SaleDetail, SaleStatus},
        service_orders::ServiceOrderDetail,
        settings::TenantSettings,
    },
    services::{
        cash_service::CashService, sales_service::SalesService,
        service_order_service::ServiceOrderService,
    },
};

/// Cupons em HTML prontos para `window.print()`, no tamanho do papel configurado.
#[derive(Clone)]
pub struct ReceiptService {
    settings_repo: SettingsRepository,
    sales_service: SalesService,
    service_order_service: ServiceOrderService,
    cash_service: CashService,
}

impl ReceiptService {
    pub fn new(
        settings_repo: SettingsRepository,
        sales_service: SalesService,
        service_order_service: ServiceOrderService,
        cash_service: CashService,
    ) -> Self {
        Self { settings_repo, sales_service, service_order_service, cash_service }
    }

    pub async fn sale_receipt<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        sale_id: Uuid,
    ) -> Result<String, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres, Connection = &'e mut PgConnection>,
    {
        let mut conn = executor.acquire().await?;
        let settings = self.settings_repo.get_settings(&mut *conn, tenant_id).await?;
        let sale = self.sales_service.get_sale(&mut *conn, tenant_id, sale_id).await?;
        Ok(render_sale(&settings, &sale))
    }

    pub async fn service_order_receipt<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        order_id: Uuid,
    ) -> Result<String, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres, Connection = &'e mut PgConnection>,
    {
        let mut conn = executor.acquire().await?;
        let settings = self.settings_repo.get_settings(&mut *conn, tenant_id).await?;
        let order = self.service_order_service.get_order(&mut *conn, tenant_id, order_id).await?;
        Ok(render_service_order(&settings, &order))
    }

    pub async fn cash_closing_receipt<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        session_id: Uuid,
    ) -> Result<String, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres, Connection = &'e mut PgConnection>,
    {
        let mut conn = executor.acquire().await?;
        let settings = self.settings_repo.get_settings(&mut *conn, tenant_id).await?;
        let summary = self.cash_service.session_summary(&mut *conn, tenant_id, session_id).await?;
        Ok(render_cash_closing(&settings, &summary))
    }
}

// --- Renderização ---

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn datetime(value: DateTime<Utc>) -> String {
    value.format("%d/%m/%Y %H:%M").to_string()
}

fn quantity(value: Decimal) -> String {
    value.normalize().to_string().replace('.', ",")
}

/// Cabeçalho da loja, estilos e abertura do `<body>`.
fn open_document(settings: &TenantSettings, title: &str) -> String {
    let width = settings.paper_width;
    let mut html = String::new();

    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
@page {{ size: {page}; margin: 0; }}
body {{ width: {page}; margin: 0 auto; padding: 4px; font-family: 'Courier New', monospace; font-size: {font}; color: #000; }}
.center {{ text-align: center; }}
.right {{ text-align: right; }}
.bold {{ font-weight: bold; }}
hr {{ border: none; border-top: 1px dashed #000; margin: 6px 0; }}
table {{ width: 100%; border-collapse: collapse; }}
td {{ vertical-align: top; padding: 1px 0; }}
img.logo {{ max-width: 60%; display: block; margin: 0 auto 4px; }}
</style>
</head>
<body>
"#,
        title = escape(title),
        page = width.css_width(),
        font = width.font_size(),
    );

    if settings.show_logo {
        if let Some(logo) = settings.logo_url.as_deref().filter(|l| !l.is_empty()) {
            let _ = writeln!(html, r#"<img class="logo" src="{}" alt="logo">"#, escape(logo));
        }
    }

    html.push_str(r#"<div class="center">"#);
    if let Some(name) = &settings.company_name {
        let _ = write!(html, r#"<div class="bold">{}</div>"#, escape(name));
    }
    if let Some(doc) = &settings.document_number {
        let _ = write!(html, "<div>CNPJ/CPF: {}</div>", escape(doc));
    }
    if let Some(address) = &settings.address {
        let _ = write!(html, "<div>{}</div>", escape(address));
    }
    if let Some(phone) = &settings.phone {
        let _ = write!(html, "<div>Tel: {}</div>", escape(phone));
    }
    html.push_str("</div>\n<hr>\n");
    html
}

fn close_document(mut html: String, settings: &TenantSettings) -> String {
    html.push_str("<hr>\n");
    if let Some(footer) = settings.receipt_footer.as_deref().filter(|f| !f.is_empty()) {
        let _ = writeln!(html, r#"<div class="center">{}</div>"#, escape(footer));
    }
    html.push_str("</body>\n</html>\n");
    html
}

fn total_row(html: &mut String, label: &str, value: Decimal, bold: bool) {
    let class = if bold { r#" class="bold""# } else { "" };
    let _ = writeln!(
        html,
        r#"<tr{class}><td>{}</td><td class="right">{}</td></tr>"#,
        escape(label),
        format_brl(value),
    );
}

pub(crate) fn render_sale(settings: &TenantSettings, detail: &SaleDetail) -> String {
    let sale = &detail.sale;
    let mut html = open_document(settings, &format!("Venda #{}", sale.display_id));

    let _ = writeln!(
        html,
        r#"<div class="center bold">CUPOM NÃO FISCAL</div><div>Venda #{} - {}</div>"#,
        sale.display_id,
        datetime(sale.created_at),
    );
    if let Some(customer) = &sale.customer_name {
        let _ = writeln!(html, "<div>Cliente: {}</div>", escape(customer));
    }
    if sale.status == SaleStatus::Cancelled {
        html.push_str(r#"<div class="center bold">*** VENDA CANCELADA ***</div>"#);
    }

    html.push_str("<hr>\n<table>\n");
    for item in &detail.items {
        let _ = writeln!(
            html,
            r#"<tr><td colspan="2">{}</td></tr><tr><td>{} x {}</td><td class="right">{}</td></tr>"#,
            escape(&item.description),
            quantity(item.quantity),
            format_brl(item.unit_price),
            format_brl(item.total),
        );
    }
    html.push_str("</table>\n<hr>\n<table>\n");
    total_row(&mut html, "Subtotal", sale.subtotal, false);
    if !sale.discount.is_zero() {
        total_row(&mut html, "Desconto", -sale.discount, false);
    }
    total_row(&mut html, "TOTAL", sale.total, true);
    let _ = writeln!(
        html,
        r#"<tr><td>Pagamento</td><td class="right">{}</td></tr>"#,
        sale.payment_method.label(),
    );
    html.push_str("</table>\n");

    close_document(html, settings)
}

pub(crate) fn render_service_order(settings: &TenantSettings, detail: &ServiceOrderDetail) -> String {
    let order = &detail.order;
    let mut html = open_document(settings, &format!("OS #{}", order.display_id));

    let _ = writeln!(
        html,
        r#"<div class="center bold">ORDEM DE SERVIÇO #{}</div><div>Abertura: {}</div><div>Status: {}</div>"#,
        order.display_id,
        datetime(order.created_at),
        escape(&detail.status_label),
    );
    let _ = writeln!(html, "<div>Cliente: {}</div>", escape(&order.customer_name));
    if let Some(phone) = &order.customer_phone {
        let _ = writeln!(html, "<div>Telefone: {}</div>", escape(phone));
    }
    let _ = writeln!(html, "<div>Equipamento: {}</div>", escape(&order.equipment));
    let _ = writeln!(html, "<div>Defeito relatado: {}</div>", escape(&order.reported_issue));
    if let Some(diagnosis) = &order.diagnosis {
        let _ = writeln!(html, "<div>Diagnóstico: {}</div>", escape(diagnosis));
    }

    html.push_str("<hr>\n<table>\n");
    for item in &detail.items {
        let _ = writeln!(
            html,
            r#"<tr><td>{} x {}</td><td class="right">{}</td></tr>"#,
            quantity(item.quantity),
            escape(&item.description),
            format_brl(item.total),
        );
    }
    html.push_str("</table>\n<hr>\n<table>\n");
    total_row(&mut html, "Mão de obra", order.labor_amount, false);
    total_row(&mut html, "Peças", order.parts_amount, false);
    if !order.discount.is_zero() {
        total_row(&mut html, "Desconto", -order.discount, false);
    }
    total_row(&mut html, "TOTAL", order.total, true);
    if let Some(method) = order.payment_method {
        let _ = writeln!(html, r#"<tr><td>Pagamento</td><td class="right">{}</td></tr>"#, method.label());
    }
    html.push_str("</table>\n");

    if let Some(delivered_at) = order.delivered_at {
        let _ = writeln!(html, "<div>Entregue em {}</div>", datetime(delivered_at));
    } else {
        html.push_str(
            "<br><br><div class=\"center\">______________________________</div>\
             <div class=\"center\">Assinatura do cliente</div>\n",
        );
    }

    close_document(html, settings)
}

pub(crate) fn render_cash_closing(settings: &TenantSettings, summary: &CashSessionSummary) -> String {
    let session = &summary.session;
    let mut html = open_document(settings, "Fechamento de caixa");

    let title = if session.is_open() { "CAIXA (PARCIAL)" } else { "FECHAMENTO DE CAIXA" };
    let _ = writeln!(
        html,
        r#"<div class="center bold">{title}</div><div>Abertura: {}</div>"#,
        datetime(session.opened_at),
    );
    if let Some(closed_at) = session.closed_at {
        let _ = writeln!(html, "<div>Fechamento: {}</div>", datetime(closed_at));
    }

    html.push_str("<hr>\n<table>\n");
    total_row(&mut html, "Fundo de troco", session.opening_float, false);
    total_row(&mut html, "Vendas", summary.totals.sales, false);
    total_row(&mut html, "OS", summary.totals.service_orders, false);
    total_row(&mut html, "Suprimentos", summary.totals.supplies, false);
    total_row(&mut html, "Sangrias", -summary.totals.withdrawals, false);
    if !summary.totals.non_cash.is_zero() {
        total_row(&mut html, "PIX/cartão (fora da gaveta)", -summary.totals.non_cash, false);
    }
    total_row(&mut html, "Saldo esperado", summary.current_balance, true);
    html.push_str("</table>\n");

    if !summary.by_payment_method.is_empty() {
        html.push_str("<hr>\n<div class=\"bold\">Por forma de pagamento</div>\n<table>\n");
        for entry in &summary.by_payment_method {
            total_row(&mut html, &entry.label, entry.total, false);
        }
        html.push_str("</table>\n");
    }

    if let Some(counted) = session.counted_amount {
        let reconciliation = Reconciliation::compute(summary.current_balance, counted);
        html.push_str("<hr>\n<table>\n");
        total_row(&mut html, "Contado", reconciliation.counted, false);
        total_row(&mut html, "Diferença", reconciliation.variance, true);
        html.push_str("</table>\n");
        let _ = writeln!(html, r#"<div class="center bold">{}</div>"#, reconciliation.label.to_uppercase());
    }
    if let Some(notes) = &session.closing_notes {
        let _ = writeln!(html, "<div>Obs: {}</div>", escape(notes));
    }

    close_document(html, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        cash::{CashMovement, CashMovementCategory, CashSession, CashSessionStatus, PaymentMethod},
        sales::{Sale, SaleItem},
        settings::PaperWidth,
    };

    fn settings(width: PaperWidth) -> TenantSettings {
        let mut s = TenantSettings::empty(Uuid::nil());
        s.company_name = Some("Assistência <Central>".into());
        s.logo_url = Some("https://loja.test/logo.png".into());
        s.receipt_footer = Some("Volte sempre!".into());
        s.paper_width = width;
        s
    }

    fn sale_detail() -> SaleDetail {
        let sale = Sale {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            display_id: 42,
            session_id: Uuid::nil(),
            customer_name: None,
            subtotal: "60.00".parse().unwrap(),
            discount: "10.00".parse().unwrap(),
            total: "50.00".parse().unwrap(),
            payment_method: PaymentMethod::Pix,
            status: SaleStatus::Completed,
            user_id: None,
            created_at: Utc::now(),
            cancelled_at: None,
        };
        let item = SaleItem {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            sale_id: sale.id,
            product_id: Uuid::new_v4(),
            description: "Película 3D".into(),
            quantity: Decimal::from(2),
            unit_price: "30.00".parse().unwrap(),
            total: "60.00".parse().unwrap(),
            created_at: Utc::now(),
        };
        SaleDetail { sale, items: vec![item] }
    }

    #[test]
    fn sale_receipt_uses_paper_width_and_brl_totals() {
        let html = render_sale(&settings(PaperWidth::Mm58), &sale_detail());

        assert!(html.contains("size: 58mm"));
        assert!(html.contains("font-size: 10px"));
        assert!(html.contains("Venda #42"));
        assert!(html.contains("2 x R$ 30,00"));
        assert!(html.contains("-R$ 10,00"));
        assert!(html.contains("R$ 50,00"));
        assert!(html.contains("PIX"));
        assert!(html.contains("Volte sempre!"));
    }

    #[test]
    fn company_data_is_html_escaped() {
        let html = render_sale(&settings(PaperWidth::Mm80), &sale_detail());
        assert!(html.contains("Assistência &lt;Central&gt;"));
        assert!(!html.contains("<Central>"));
    }

    #[test]
    fn logo_is_hidden_when_disabled() {
        let mut s = settings(PaperWidth::A4);
        assert!(render_sale(&s, &sale_detail()).contains("logo.png"));
        s.show_logo = false;
        assert!(!render_sale(&s, &sale_detail()).contains("logo.png"));
    }

    #[test]
    fn closing_receipt_shows_reconciliation() {
        let now = Utc::now();
        let session = CashSession {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            status: CashSessionStatus::Closed,
            opening_float: "100.00".parse().unwrap(),
            opened_by: None,
            opened_at: now,
            total_sales: Some("50.00".parse().unwrap()),
            total_service_orders: Some(Decimal::ZERO),
            total_supplies: Some(Decimal::ZERO),
            total_withdrawals: Some("20.00".parse().unwrap()),
            expected_balance: Some("130.00".parse().unwrap()),
            counted_amount: Some("130.00".parse().unwrap()),
            variance: Some(Decimal::ZERO),
            closing_notes: None,
            closed_by: None,
            closed_at: Some(now),
        };
        let movement = |category, amount: &str, method| CashMovement {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            session_id: session.id,
            category,
            amount: amount.parse().unwrap(),
            description: None,
            payment_method: method,
            sale_id: None,
            service_order_id: None,
            user_id: None,
            created_at: now,
        };
        let movements = vec![
            movement(CashMovementCategory::Opening, "100.00", None),
            movement(CashMovementCategory::Sale, "50.00", Some(PaymentMethod::Cash)),
            movement(CashMovementCategory::Sale, "30.00", Some(PaymentMethod::Pix)),
            movement(CashMovementCategory::Withdrawal, "-20.00", None),
        ];
        let summary = CashSessionSummary::build(session, &movements);
        let html = render_cash_closing(&settings(PaperWidth::Mm80), &summary);

        assert!(html.contains("FECHAMENTO DE CAIXA"));
        assert!(html.contains("R$ 130,00"));
        assert!(html.contains("SEM DIFERENÇA"));
        assert!(html.contains("Dinheiro"));
        // Venda no PIX não entra no dinheiro esperado
        assert!(html.contains("PIX/cartão (fora da gaveta)"));
        assert!(html.contains("-R$ 30,00"));
    }
}
