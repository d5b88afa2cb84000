use ai_email::form::{ApiClient, EmailForm};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

type Input = Lines<BufReader<Stdin>>;

/// Prompts for one line; `None` once stdin is closed.
async fn ask(
    input: &mut Input,
    label: &str,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(label.as_bytes()).await?;
    stdout.flush().await?;
    Ok(input.next_line().await?)
}

/// Reads lines until a lone `.`; returns `None` when the first line is empty.
async fn ask_multiline(
    input: &mut Input,
    label: &str,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    println!("{label}");
    let mut lines = Vec::new();
    while let Some(line) = input.next_line().await? {
        if line == "." || (lines.is_empty() && line.is_empty()) {
            break;
        }
        lines.push(line);
    }
    Ok((!lines.is_empty()).then(|| lines.join("\n")))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let api = ApiClient::from_env();
    println!("Using backend at {}\n", api.base_url());

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut form = EmailForm::new();

    // Draft until the user accepts a generated email
    loop {
        let Some(prompt) = ask(&mut input, "🧠 Prompt: ").await? else {
            return Ok(());
        };
        form.prompt = prompt;
        form.generate(&api).await;
        println!("{}", form.render());

        if !form.has_draft() {
            continue;
        }
        let answer = ask(&mut input, "Regenerate? [y/N]: ").await?;
        if answer.is_some_and(|a| a.trim().eq_ignore_ascii_case("y")) {
            continue;
        }
        break;
    }

    if let Some(edited) = ask_multiline(
        &mut input,
        "Edit the draft (end with a line containing '.'), or press Enter to keep it:",
    )
    .await?
    {
        form.generated_email = edited;
    }

    let Some(recipients) = ask(&mut input, "Recipient email: ").await? else {
        return Ok(());
    };
    form.recipients = recipients;
    form.subject = ask(&mut input, "Subject (optional): ")
        .await?
        .unwrap_or_default();

    form.sending = true;
    println!("{}", form.render());
    form.send(&api).await;
    println!("{}", form.render());

    Ok(())
}
