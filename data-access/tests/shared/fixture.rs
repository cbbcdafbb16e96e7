use model::{Idiom, Implementation, MessageForUser};

pub fn swap() -> Idiom {
    Idiom::new(42, "swap").with_implementation(Implementation::new(
        100,
        "go",
        "a, b = b, a",
    ))
}

pub fn reverse_list() -> Idiom {
    let mut idiom = Idiom::new(7, "Reverse a list")
        .with_implementation(Implementation::new(5, "rust", "x.reverse();"))
        .with_implementation(Implementation::new(7, "python", "x.reverse()"));
    idiom.lead_paragraph = "Reverse the order of the elements of list x.".into();
    idiom.rating = 3;
    idiom
}

pub fn hello() -> Idiom {
    let mut idiom = Idiom::new(1, "Print Hello World")
        .with_implementation(Implementation::new(11, "rust", "println!(\"Hello World\");"))
        .with_implementation(Implementation::new(12, "go", "fmt.Println(\"Hello World\")"));
    idiom.rating = 10;
    idiom
}

pub fn welcome(username: &str) -> MessageForUser {
    MessageForUser::new(username, format!("welcome, {username}"))
}

pub fn langs(langs: &[&str]) -> Vec<String> {
    langs.iter().map(|lang| lang.to_string()).collect()
}
