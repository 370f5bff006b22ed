use rand::Rng;
use rand::seq::IndexedRandom;

const MATERIAL_PROMPTS: [&str; 10] = [
    "Ты опытный преподаватель программирования. Создай подробный обучающий материал по синтаксису языка {language} для дня {difficulty}. Ответ должен содержать только текст обучающего материала без лишних комментариев. Заключение писать не надо. Писать, какой день тоже не надо.",
    "Будучи экспертом в программировании, составь детальный материал по синтаксису языка {language} для дня {difficulty}. Выдай только необходимый текст без излишеств, без упоминания дня и заключения.",
    "Ты профессиональный преподаватель по программированию. Сформируй подробный обучающий материал по синтаксису {language} для дня {difficulty}. Твой ответ должен состоять исключительно из текста материала, без лишних комментариев и без указания дня.",
    "Составь, как опытный преподаватель, детальный обучающий материал по синтаксису языка {language} для дня {difficulty}. Ответ должен быть только текстом материала без дополнительных пояснений, без заключения и без указания дня.",
    "Ты отлично разбираешься в синтаксисе языка {language}. Подготовь подробный обучающий материал для дня {difficulty}. Текст должен быть информативным и лаконичным, без излишеств, без заключения и без упоминания дня.",
    "Как опытный преподаватель программирования, создай детальный обучающий материал по синтаксису языка {language} для дня {difficulty}. Не добавляй лишних комментариев и заключения, ответ должен содержать только основной текст материала.",
    "Ты опытный учитель программирования. Составь подробный материал по синтаксису языка {language} для дня {difficulty}. Ответ должен включать только текст обучающего материала без лишних пояснений, без заключения и без указания дня.",
    "В роли эксперта по программированию сформируй детальный обучающий материал по синтаксису {language} для дня {difficulty}. Твой ответ должен быть лаконичным и содержать только текст материала, без упоминания дня и без заключения.",
    "Как опытный преподаватель, напиши подробный обучающий материал по синтаксису языка {language} для дня {difficulty}. Ответ должен быть исключительно текстом материала, без дополнительных комментариев, заключения и указания дня.",
    "Будучи профессионалом в программировании, составь детальный материал по синтаксису {language} для дня {difficulty}. Твой ответ должен содержать только текст обучающего материала, без излишеств, без заключения и без упоминания номера дня.",
];

const QUESTIONS_PROMPT: &str = "Ты опытный преподаватель программирования. \
Составь тест из 15 вопросов для изучения синтаксиса языка {language} на основе материала {material} для дня {difficulty}. \
Первые 10 вопросов должны быть с 4 вариантами ответа (A, B, C, D) в формате:\n\
1. Вопрос\n   A) Вариант A\n   B) Вариант B\n   C) Вариант C\n   D) Вариант D\n\n\
Последние 5 вопросов с 11 по 15 должны быть практическими заданиями без вариантов ответа, \
где требуется написать небольшой фрагмент кода. \
Ответ должен содержать только текст теста без дополнительных комментариев.";

const EVALUATION_PROMPT: &str = "Ты опытный преподаватель {language}. Проанализируй следующие ответы пользователя по тесту:\n\n\
{answers}\n\n\
Верни ответ строго в следующем формате (без лишних слов или комментариев):\n\n\
Количество правильных: <число> из 15\n\
Рекомендации: <текст рекомендаций>\n\n\
Где <число> – это целое число, отражающее количество правильных ответов, а <текст рекомендаций> – подробные рекомендации по вопросам, вежливо напиши и подбодри от первого лица, которые стоит доучить на основе неверных ответов.";

const RESULT_PROMPTS: [&str; 5] = [
    "Ты опытный преподаватель {language}. Пользователь завершил тест по изучению синтаксиса {language} с результатом: {correct}% правильных ответов и {incorrect}% неправильных ответов. Поздравь его с завершением обучения, похвали за проделанную работу, даже если результат не идеален, и подбодри его. Дай подробные рекомендации по улучшению знаний. Верни ответ строго в следующем формате:\n\nКоличество правильных: <число>%\nРекомендации: <текст рекомендаций>.",
    "Выполняй роль опытного преподавателя {language}. Пользователь завершил тест по синтаксису {language} и получил {correct}% правильных и {incorrect}% неправильных ответов. Пожалуйста, поздравь его, похвали за усилия, подбодри для дальнейшего обучения и дай рекомендации по темам, которые нужно доработать. Выведи ответ строго в следующем формате:\n\nКоличество правильных: <число>%\nРекомендации: <текст рекомендаций>.",
    "Ты эксперт в преподавании {language}. Пользователь прошёл тест по синтаксису {language} с результатом: {correct}% правильных ответов и {incorrect}% неправильных ответов. Поздравь его с окончанием теста, похвали за проделанную работу даже если результат не идеален, и подбодри для дальнейшего изучения, предоставив рекомендации по улучшению знаний. Ответ должен быть выдан в формате:\n\nКоличество правильных: <число>%\nРекомендации: <текст рекомендаций>.",
    "Представь, что ты опытный преподаватель {language}. Пользователь завершил тест по синтаксису {language} с результатом {correct}% правильных ответов и {incorrect}% ошибок. Поздравь его с окончанием теста, похвали за проделанную работу и подбодри для дальнейшего обучения, указав рекомендации по темам, требующим доработки. Верни ответ в следующем формате:\n\nКоличество правильных: <число>%\nРекомендации: <текст рекомендаций>.",
    "Как опытный преподаватель {language}, проанализируй результаты теста пользователя по синтаксису {language}: {correct}% правильных ответов и {incorrect}% неправильных. Поздравь его с завершением обучения, отметь его усилия, даже если результат не совершенен, и предложи рекомендации по улучшению знаний. Ответ должен быть строго в формате:\n\nКоличество правильных: <число>%\nРекомендации: <текст рекомендаций>.",
];

pub fn material_templates() -> &'static [&'static str] {
    &MATERIAL_PROMPTS
}

pub fn result_templates() -> &'static [&'static str] {
    &RESULT_PROMPTS
}

/// Picks one template uniformly at random, or `None` from an empty list.
pub fn choose_template<'a, R: Rng>(rng: &mut R, templates: &[&'a str]) -> Option<&'a str> {
    templates.choose(rng).copied()
}

/// Fills `{name}` placeholders in a single pass, so substituted values are
/// never expanded again. Unknown placeholders are left as they are.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];
        let Some(close) = after_open.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let name = &after_open[..close];
        match vars.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[open..open + close + 2]),
        }
        rest = &after_open[close + 1..];
    }

    out.push_str(rest);
    out
}

pub fn material_prompt<R: Rng>(rng: &mut R, language: &str, difficulty: &str) -> String {
    let template = choose_template(rng, &MATERIAL_PROMPTS).unwrap_or(MATERIAL_PROMPTS[0]);
    render(
        template,
        &[("language", language), ("difficulty", difficulty)],
    )
}

pub fn questions_prompt(language: &str, material: &str, difficulty: &str) -> String {
    render(
        QUESTIONS_PROMPT,
        &[
            ("language", language),
            ("material", material),
            ("difficulty", difficulty),
        ],
    )
}

pub fn evaluation_prompt(language: &str, questions_with_answers: &str) -> String {
    render(
        EVALUATION_PROMPT,
        &[("language", language), ("answers", questions_with_answers)],
    )
}

pub fn result_prompt<R: Rng>(
    rng: &mut R,
    language: &str,
    correct_percentage: f64,
    incorrect_percentage: f64,
) -> String {
    let template = choose_template(rng, &RESULT_PROMPTS).unwrap_or(RESULT_PROMPTS[0]);
    let correct = correct_percentage.to_string();
    let incorrect = incorrect_percentage.to_string();
    render(
        template,
        &[
            ("language", language),
            ("correct", correct.as_str()),
            ("incorrect", incorrect.as_str()),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn render_substitutes_once() {
        let rendered = render(
            "learn {language} on day {difficulty}",
            &[("language", "{difficulty}"), ("difficulty", "3")],
        );
        assert_eq!(rendered, "learn {difficulty} on day 3");
    }

    #[test]
    fn render_keeps_unknown_and_unclosed_braces() {
        assert_eq!(render("a {x} b", &[("y", "1")]), "a {x} b");
        assert_eq!(render("fn main() {", &[]), "fn main() {");
        assert_eq!(render("{}", &[]), "{}");
    }

    #[test]
    fn render_handles_multibyte_text() {
        assert_eq!(
            render("язык {language}!", &[("language", "Раст")]),
            "язык Раст!"
        );
    }

    #[test]
    fn material_prompt_is_one_of_the_templates() {
        let mut rng = StdRng::seed_from_u64(7);
        let prompt = material_prompt(&mut rng, "Python", "4");

        let candidates: Vec<String> = material_templates()
            .iter()
            .map(|t| render(t, &[("language", "Python"), ("difficulty", "4")]))
            .collect();
        assert!(candidates.contains(&prompt));
        assert!(!prompt.contains('{'));
    }

    #[test]
    fn selection_is_deterministic_for_a_seed() {
        let a = material_prompt(&mut StdRng::seed_from_u64(42), "Go", "1");
        let b = material_prompt(&mut StdRng::seed_from_u64(42), "Go", "1");
        assert_eq!(a, b);
    }

    #[test]
    fn selection_covers_every_template() {
        let mut rng = StdRng::seed_from_u64(1);
        let seen: HashSet<&str> = (0..500)
            .filter_map(|_| choose_template(&mut rng, result_templates()))
            .collect();
        assert_eq!(seen.len(), result_templates().len());
    }

    #[test]
    fn empty_template_list_yields_none() {
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(choose_template(&mut rng, &[]), None);
        assert_eq!(choose_template(&mut rng, &["only"]), Some("only"));
    }

    #[test]
    fn result_prompt_formats_percentages() {
        let mut rng = StdRng::seed_from_u64(3);
        let prompt = result_prompt(&mut rng, "Rust", 60.0, 40.0);
        assert!(prompt.contains("60%"));
        assert!(prompt.contains("40%"));
        assert!(prompt.contains("Rust"));
        assert!(prompt.contains("Количество правильных: <число>%"));
    }

    #[test]
    fn questions_prompt_embeds_material_verbatim() {
        let prompt = questions_prompt("C++", "cout << {x};", "2");
        assert!(prompt.contains("на основе материала cout << {x}; для дня 2"));
        assert!(prompt.contains("1. Вопрос\n   A) Вариант A"));
    }

    #[test]
    fn evaluation_prompt_embeds_answers() {
        let prompt = evaluation_prompt("Python", "{\"1\": {}}");
        assert!(prompt.starts_with("Ты опытный преподаватель Python."));
        assert!(prompt.contains("{\"1\": {}}"));
        assert!(prompt.contains("Количество правильных: <число> из 15"));
    }
}
