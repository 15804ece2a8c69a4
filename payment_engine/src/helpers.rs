use rand::Rng;

const PAYMENT_ID_PREFIX: &str = "PAY-";
const ORDER_NUMBER_PREFIX: &str = "ORD-";

fn random_upper_hex(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| char::from_digit(rng.gen_range(0..16), 16).unwrap_or('0').to_ascii_uppercase()).collect()
}

/// Generates a fresh local payment identifier, `PAY-` followed by 12 upper-case hex characters.
pub fn new_payment_id() -> String {
    format!("{PAYMENT_ID_PREFIX}{}", random_upper_hex(12))
}

/// Generates an order number in the format used by checkout, `ORD-` followed by 8 upper-case hex characters.
pub fn new_order_number() -> String {
    format!("{ORDER_NUMBER_PREFIX}{}", random_upper_hex(8))
}

pub fn is_valid_payment_id(s: &str) -> bool {
    s.strip_prefix(PAYMENT_ID_PREFIX)
        .map(|hex| hex.len() == 12 && hex.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)))
        .unwrap_or(false)
}
