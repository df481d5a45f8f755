// src/services/document_service.rs

use genpdf::{elements, style, Alignment, Element};
use image::Luma;
use qrcode::QrCode;
use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, money::format_brl},
    db::SettingsRepository,
    models::{service_orders::ServiceOrderDetail, settings::TenantSettings},
    services::service_order_service::ServiceOrderService,
};

/// PDF A4 da OS (via do cliente), com QR Code PIX quando há valor a receber.
#[derive(Clone)]
pub struct DocumentService {
    service_order_service: ServiceOrderService,
    settings_repo: SettingsRepository,
    fonts_dir: String,
}

impl DocumentService {
    pub fn new(
        service_order_service: ServiceOrderService,
        settings_repo: SettingsRepository,
        fonts_dir: String,
    ) -> Self {
        Self { service_order_service, settings_repo, fonts_dir }
    }

    pub async fn generate_service_order_pdf<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        order_id: Uuid,
    ) -> Result<Vec<u8>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres, Connection = &'e mut PgConnection>,
    {
        // 1. Dados
        let mut conn = executor.acquire().await?;
        let detail = self.service_order_service.get_order(&mut *conn, tenant_id, order_id).await?;
        let settings = self.settings_repo.get_settings(&mut *conn, tenant_id).await?;
        drop(conn);

        // 2. Renderização (CPU) fora do runtime
        let fonts_dir = self.fonts_dir.clone();
        tokio::task::spawn_blocking(move || render_service_order_pdf(&fonts_dir, &settings, &detail))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task do PDF: {}", e))?
    }
}

fn doc_error(e: impl std::fmt::Display) -> AppError {
    AppError::DocumentError(e.to_string())
}

/// O PIX só aparece enquanto a OS não foi entregue e tem valor.
fn pix_amount(detail: &ServiceOrderDetail) -> Option<Decimal> {
    let order = &detail.order;
    (!order.status.is_final() && order.total > Decimal::ZERO).then_some(order.total)
}

fn render_service_order_pdf(
    fonts_dir: &str,
    settings: &TenantSettings,
    detail: &ServiceOrderDetail,
) -> Result<Vec<u8>, AppError> {
    let order = &detail.order;

    let font_family = genpdf::fonts::from_files(fonts_dir, "Roboto", None).map_err(doc_error)?;

    let mut doc = genpdf::Document::new(font_family);
    doc.set_title(format!("OS #{}", order.display_id));
    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);

    // --- CABEÇALHO ---
    let company = settings.company_name.clone().unwrap_or_else(|| "Assistência Técnica".to_string());
    doc.push(elements::Paragraph::new(company).styled(style::Style::new().bold().with_font_size(18)));
    if let Some(doc_num) = &settings.document_number {
        doc.push(elements::Paragraph::new(format!("CNPJ/CPF: {}", doc_num))
            .styled(style::Style::new().with_font_size(10)));
    }
    if let Some(phone) = &settings.phone {
        doc.push(elements::Paragraph::new(format!("Tel: {}", phone))
            .styled(style::Style::new().with_font_size(10)));
    }

    doc.push(elements::Break::new(1.5));
    doc.push(elements::Paragraph::new(format!("ORDEM DE SERVIÇO #{}", order.display_id))
        .styled(style::Style::new().bold().with_font_size(14)));
    doc.push(elements::Paragraph::new(format!(
        "Abertura: {}    Status: {}",
        order.created_at.format("%d/%m/%Y"),
        detail.status_label
    )));

    // --- CLIENTE E EQUIPAMENTO ---
    doc.push(elements::Break::new(1));
    doc.push(elements::Paragraph::new(format!("Cliente: {}", order.customer_name)));
    if let Some(phone) = &order.customer_phone {
        doc.push(elements::Paragraph::new(format!("Telefone: {}", phone)));
    }
    doc.push(elements::Paragraph::new(format!("Equipamento: {}", order.equipment)));
    doc.push(elements::Paragraph::new(format!("Defeito relatado: {}", order.reported_issue)));
    if let Some(diagnosis) = &order.diagnosis {
        doc.push(elements::Paragraph::new(format!("Diagnóstico: {}", diagnosis)));
    }

    doc.push(elements::Break::new(2));

    // --- ITENS ---
    // Pesos das colunas: Descrição (4), Qtd (1), Unitário (2), Total (2)
    let mut table = elements::TableLayout::new(vec![4, 1, 2, 2]);
    table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

    let style_bold = style::Style::new().bold();
    table.row()
        .element(elements::Paragraph::new("Descrição").styled(style_bold))
        .element(elements::Paragraph::new("Qtd").styled(style_bold))
        .element(elements::Paragraph::new("Unitário").styled(style_bold))
        .element(elements::Paragraph::new("Total").styled(style_bold))
        .push()
        .map_err(doc_error)?;

    table.row()
        .element(elements::Paragraph::new("Mão de obra"))
        .element(elements::Paragraph::new("1"))
        .element(elements::Paragraph::new(format_brl(order.labor_amount)))
        .element(elements::Paragraph::new(format_brl(order.labor_amount)))
        .push()
        .map_err(doc_error)?;

    for item in &detail.items {
        table.row()
            .element(elements::Paragraph::new(item.description.clone()))
            .element(elements::Paragraph::new(item.quantity.normalize().to_string()))
            .element(elements::Paragraph::new(format_brl(item.unit_price)))
            .element(elements::Paragraph::new(format_brl(item.total)))
            .push()
            .map_err(doc_error)?;
    }

    doc.push(table);
    doc.push(elements::Break::new(1));

    // --- TOTAIS ---
    if !order.discount.is_zero() {
        let mut discount = elements::Paragraph::new(format!("Desconto: -{}", format_brl(order.discount)));
        discount.set_alignment(Alignment::Right);
        doc.push(discount);
    }
    let mut total = elements::Paragraph::new(format!("TOTAL: {}", format_brl(order.total)));
    total.set_alignment(Alignment::Right);
    doc.push(total.styled(style::Style::new().bold().with_font_size(12)));

    // --- PIX ---
    if let (Some(key), Some(amount)) = (settings.pix_key.as_deref(), pix_amount(detail)) {
        doc.push(elements::Break::new(2));
        doc.push(elements::Paragraph::new("PAGAMENTO VIA PIX")
            .styled(style::Style::new().bold().with_font_size(12)));
        doc.push(elements::Paragraph::new(format!("Chave: {}    Valor: {}", key, format_brl(amount))));
        doc.push(elements::Break::new(1));

        // QR simples com a chave; o valor vai impresso ao lado
        let code = QrCode::new(key.as_bytes()).map_err(doc_error)?;
        let image_buffer = code.render::<Luma<u8>>().build();
        let dynamic_image = image::DynamicImage::ImageLuma8(image_buffer);

        let pdf_image = elements::Image::from_dynamic_image(dynamic_image)
            .map_err(doc_error)?
            .with_scale(genpdf::Scale::new(0.5, 0.5));
        doc.push(pdf_image);
    }

    // --- RODAPÉ ---
    doc.push(elements::Break::new(3));
    doc.push(elements::Paragraph::new("______________________________"));
    doc.push(elements::Paragraph::new("Assinatura do cliente"));
    if let Some(addr) = &settings.address {
        doc.push(elements::Break::new(1));
        doc.push(elements::Paragraph::new(addr.clone()).styled(style::Style::new().italic().with_font_size(8)));
    }

    let mut buffer = Vec::new();
    doc.render(&mut buffer).map_err(doc_error)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::service_orders::{ServiceOrder, ServiceOrderStatus};
    use chrono::Utc;

    fn detail(status: ServiceOrderStatus, total: i64) -> ServiceOrderDetail {
        let now = Utc::now();
        ServiceOrderDetail {
            order: ServiceOrder {
                id: Uuid::new_v4(),
                tenant_id: Uuid::nil(),
                display_id: 3,
                customer_name: "João".into(),
                customer_phone: None,
                equipment: "Notebook".into(),
                reported_issue: "Não carrega".into(),
                diagnosis: None,
                status,
                labor_amount: Decimal::from(total),
                parts_amount: Decimal::ZERO,
                discount: Decimal::ZERO,
                total: Decimal::from(total),
                payment_method: None,
                session_id: None,
                technician_id: None,
                created_at: now,
                updated_at: now,
                delivered_at: None,
            },
            status_label: status.label().to_string(),
            items: Vec::new(),
        }
    }

    #[test]
    fn pix_is_offered_only_for_open_orders_with_value() {
        assert_eq!(pix_amount(&detail(ServiceOrderStatus::Ready, 150)), Some(Decimal::from(150)));
        assert_eq!(pix_amount(&detail(ServiceOrderStatus::Delivered, 150)), None);
        assert_eq!(pix_amount(&detail(ServiceOrderStatus::Open, 0)), None);
    }

    #[test]
    fn missing_fonts_become_a_document_error() {
        let settings = TenantSettings::empty(Uuid::nil());
        let res = render_service_order_pdf("./nao-existe", &settings, &detail(ServiceOrderStatus::Open, 10));
        assert!(matches!(res, Err(AppError::DocumentError(_))));
    }
}
