// src/common/i18n.rs

use std::collections::HashMap;
use std::sync::LazyLock;

const DEFAULT_LANG: &str = "pt";

// (chave, português, inglês)
const MESSAGES: &[(&str, &str, &str)] = &[
    ("validation_failed", "Um ou mais campos são inválidos.", "One or more fields are invalid."),
    ("email_already_exists", "Este e-mail já está em uso.", "This e-mail is already in use."),
    ("invalid_credentials", "E-mail ou senha inválidos.", "Invalid e-mail or password."),
    ("invalid_token", "Token de autenticação inválido ou ausente.", "Missing or invalid authentication token."),
    ("user_not_found", "Usuário não encontrado.", "User not found."),
    ("tenant_access_denied", "Você não tem acesso a esta empresa.", "You do not have access to this company."),
    ("invalid_tenant_header", "O cabeçalho X-Tenant-ID é obrigatório e deve ser um UUID.", "The X-Tenant-ID header is required and must be a UUID."),
    ("permission_denied", "Você não tem permissão para realizar esta ação.", "You are not allowed to perform this action."),
    ("not_found", "Registro não encontrado.", "Record not found."),
    ("sku_already_exists", "Já existe um produto com este SKU.", "A product with this SKU already exists."),
    ("coupon_code_already_exists", "Já existe um cupom com este código.", "A coupon with this code already exists."),
    ("plan_name_already_exists", "Já existe um plano com este nome.", "A plan with this name already exists."),
    ("member_already_exists", "Este usuário já é membro da empresa.", "This user is already a member of the company."),
    ("cash_session_already_open", "Já existe um caixa aberto para esta empresa.", "There is already an open cash session."),
    ("cash_session_not_open", "Nenhum caixa aberto. Abra o caixa antes de continuar.", "No open cash session. Open one first."),
    ("cash_session_closed", "Este caixa já foi fechado.", "This cash session is already closed."),
    ("withdrawal_exceeds_balance", "Valor da sangria maior que o saldo em caixa.", "Withdrawal is greater than the cash balance."),
    ("non_positive_amount", "O valor deve ser maior que zero.", "Amount must be greater than zero."),
    ("insufficient_stock", "Estoque insuficiente para a operação.", "Insufficient stock for this operation."),
    ("invalid_quantity", "Quantidade inválida.", "Invalid quantity."),
    ("product_inactive", "Produto inativo.", "Product is inactive."),
    ("discount_exceeds_subtotal", "O desconto não pode ser maior que o subtotal.", "Discount cannot exceed the subtotal."),
    ("empty_sale", "A venda precisa ter ao menos um item.", "A sale needs at least one item."),
    ("sale_already_cancelled", "Esta venda já foi cancelada.", "This sale is already cancelled."),
    ("invalid_status_transition", "Mudança de status não permitida.", "Status change not allowed."),
    ("item_description_required", "Informe a descrição do serviço ou escolha um produto.", "Provide a service description or pick a product."),
    ("service_order_finalized", "Esta OS já foi finalizada e não pode ser alterada.", "This service order is finalized and cannot be changed."),
    ("invalid_coupon", "Cupom inválido.", "Invalid coupon."),
    ("plan_inactive", "Plano indisponível.", "Plan is not available."),
    ("internal_error", "Ocorreu um erro inesperado.", "An unexpected error occurred."),
];

static GLOBAL: LazyLock<I18nStore> = LazyLock::new(I18nStore::new);

/// Catálogo de mensagens de erro por idioma.
#[derive(Debug)]
pub struct I18nStore {
    messages: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl I18nStore {
    pub fn new() -> Self {
        let mut pt = HashMap::new();
        let mut en = HashMap::new();
        for (key, pt_msg, en_msg) in MESSAGES {
            pt.insert(*key, *pt_msg);
            en.insert(*key, *en_msg);
        }

        let mut messages = HashMap::new();
        messages.insert("pt", pt);
        messages.insert("en", en);
        Self { messages }
    }

    pub fn global() -> &'static I18nStore {
        &GLOBAL
    }

    /// Idioma desconhecido cai no português; chave desconhecida volta a própria chave.
    pub fn translate(&self, lang: &str, key: &str) -> String {
        self.messages
            .get(lang)
            .or_else(|| self.messages.get(DEFAULT_LANG))
            .and_then(|catalog| catalog.get(key))
            .map(|msg| msg.to_string())
            .unwrap_or_else(|| key.to_string())
    }
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_portuguese_for_unknown_language() {
        let store = I18nStore::new();
        assert_eq!(
            store.translate("de", "cash_session_not_open"),
            "Nenhum caixa aberto. Abra o caixa antes de continuar."
        );
        assert_eq!(store.translate("en", "invalid_coupon"), "Invalid coupon.");
    }

    #[test]
    fn unknown_key_is_returned_verbatim() {
        assert_eq!(I18nStore::global().translate("pt", "nope"), "nope");
    }
}
