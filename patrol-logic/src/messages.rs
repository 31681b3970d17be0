//! User-facing strings shown by the patrol screen

pub const TITLE: &str = "Активний обхід";

pub const AWAITING_LOCATION: &str = "Очікуємо на ваше місцезнаходження...";

pub const OUT_OF_RADIUS: &str = "Ви не знаходитесь у радіусі цієї точки";

pub const ALL_VERIFIED: &str = "Всі точки перевірено!";

pub const END_PATROL_CONFIRM: &str =
    "Ви впевнені, що хочете завершити обхід? Неперевірені точки будуть позначені як пропущені.";

pub const ENABLE_TEST_MODE: &str = "Увімкнути тестовий режим";

pub const DISABLE_TEST_MODE: &str = "Вимкнути тестовий режим";

pub fn progress(completed: u32, total: u32) -> String {
    format!("{completed}/{total} перевірено")
}

pub fn remaining(count: u32) -> String {
    format!("{count} залишилось")
}

pub fn test_mode_banner(divisor: u32) -> String {
    format!(
        "Тестовий режим активний: час очікування скорочено в {divisor} разів для швидкого тестування"
    )
}
