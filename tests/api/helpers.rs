use std::{
    sync::{Arc, LazyLock, Mutex},
    time::Duration,
};

use contact_relay::{
    configuration::{Environment, Settings, get_configuration},
    startup::Application,
    telemetry::{get_subscriber, init_subscriber},
};
use secrecy::SecretString;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
};

// Ensure that the `tracing` stack is only initialised once using `LazyLock`
static TRACING: LazyLock<()> = LazyLock::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    };
});

pub const SMTP_PASSWORD: &str = "correct-horse-battery-staple";

pub struct TestApp {
    pub address: String,
    pub smtp_server: FakeSmtpServer,
    pub api_client: reqwest::Client,
}

impl TestApp {
    pub fn contact_url(&self) -> String {
        format!("{}/api/contact", &self.address)
    }

    pub async fn post_contact(&self, body: &serde_json::Value) -> reqwest::Response {
        self.api_client
            .post(self.contact_url())
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn request_contact(&self, method: reqwest::Method) -> reqwest::Response {
        self.api_client
            .request(method, self.contact_url())
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

pub fn valid_submission() -> serde_json::Value {
    serde_json::json!({
        "firstName": "Ursula",
        "lastName": "Le Guin",
        "email": "ursula_le_guin@gmail.com",
        "message": "Hello there"
    })
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(SmtpBehaviour::Accept, |_| {}).await
}

pub async fn spawn_app_with(
    behaviour: SmtpBehaviour,
    configure: impl FnOnce(&mut Settings),
) -> TestApp {
    LazyLock::force(&TRACING);

    let smtp_server = FakeSmtpServer::start(behaviour).await;

    // Randomise configuration to ensure test isolation
    let configuration = {
        let mut c = get_configuration().expect("Failed to read configuration.");
        c.environment = Environment::Production;
        // Use a random OS port
        c.application.host = "127.0.0.1".into();
        c.application.port = 0;
        c.smtp.host = "127.0.0.1".into();
        c.smtp.port = smtp_server.port;
        c.smtp.user = None;
        c.smtp.password = Some(SecretString::from(SMTP_PASSWORD.to_string()));
        c.smtp.timeout_milliseconds = 2000;
        configure(&mut c);
        c
    };

    let application = Application::build(configuration)
        .await
        .expect("Failed to build application.");
    let application_port = application.port();
    tokio::spawn(application.run_until_stopped());

    TestApp {
        address: format!("http://127.0.0.1:{}", application_port),
        smtp_server,
        api_client: reqwest::Client::new(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SmtpBehaviour {
    Accept,
    /// Answers `MAIL FROM` with a permanent failure.
    RejectMail,
    /// Accepts the connection and never says a word.
    Silent,
}

#[derive(Clone, Debug, Default)]
pub struct ReceivedMail {
    pub auth: Option<String>,
    pub mail_from: String,
    pub rcpt_to: Vec<String>,
    pub data: String,
}

/// A just-enough SMTP server that records what it is sent.
pub struct FakeSmtpServer {
    pub port: u16,
    inbox: Arc<Mutex<Vec<ReceivedMail>>>,
    connections: Arc<Mutex<usize>>,
}

impl FakeSmtpServer {
    pub async fn start(behaviour: SmtpBehaviour) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake SMTP server.");
        let port = listener.local_addr().unwrap().port();
        let inbox = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(Mutex::new(0));

        let session_inbox = inbox.clone();
        let session_connections = connections.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                *session_connections.lock().unwrap() += 1;
                tokio::spawn(serve_session(stream, session_inbox.clone(), behaviour));
            }
        });

        Self {
            port,
            inbox,
            connections,
        }
    }

    pub fn received(&self) -> Vec<ReceivedMail> {
        self.inbox.lock().unwrap().clone()
    }

    pub fn connections(&self) -> usize {
        *self.connections.lock().unwrap()
    }
}

async fn serve_session(
    stream: TcpStream,
    inbox: Arc<Mutex<Vec<ReceivedMail>>>,
    behaviour: SmtpBehaviour,
) -> std::io::Result<()> {
    if behaviour == SmtpBehaviour::Silent {
        let _held_open = stream;
        tokio::time::sleep(Duration::from_secs(30)).await;
        return Ok(());
    }

    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    let mut mail = ReceivedMail::default();

    writer.write_all(b"220 localhost ESMTP fake\r\n").await?;
    while let Some(line) = lines.next_line().await? {
        let command = line.to_ascii_uppercase();
        if command.starts_with("EHLO") || command.starts_with("HELO") {
            writer
                .write_all(b"250-localhost\r\n250-AUTH PLAIN LOGIN\r\n250 8BITMIME\r\n")
                .await?;
        } else if command.starts_with("AUTH") {
            mail.auth = Some(line);
            writer
                .write_all(b"235 2.7.0 Authentication successful\r\n")
                .await?;
        } else if command.starts_with("MAIL FROM:") {
            if behaviour == SmtpBehaviour::RejectMail {
                writer.write_all(b"554 5.7.1 Sender rejected\r\n").await?;
                continue;
            }
            mail.mail_from = line["MAIL FROM:".len()..].to_string();
            writer.write_all(b"250 2.1.0 OK\r\n").await?;
        } else if command.starts_with("RCPT TO:") {
            mail.rcpt_to.push(line["RCPT TO:".len()..].to_string());
            writer.write_all(b"250 2.1.5 OK\r\n").await?;
        } else if command == "DATA" {
            writer
                .write_all(b"354 End data with <CR><LF>.<CR><LF>\r\n")
                .await?;
            let mut data = String::new();
            while let Some(data_line) = lines.next_line().await? {
                if data_line == "." {
                    break;
                }
                let data_line = data_line.strip_prefix('.').unwrap_or(&data_line);
                data.push_str(data_line);
                data.push('\n');
            }
            mail.data = data;
            inbox.lock().unwrap().push(std::mem::take(&mut mail));
            writer.write_all(b"250 2.0.0 OK queued\r\n").await?;
        } else if command == "QUIT" {
            writer.write_all(b"221 2.0.0 Bye\r\n").await?;
            break;
        } else {
            writer.write_all(b"250 2.0.0 OK\r\n").await?;
        }
    }
    Ok(())
}
