//! [`Command`] tests against in-memory infrastructure.
//!
//! [`Command`]: service::Command

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use common::operations::{By, Deliver, Insert, Select, Update};
use secrecy::SecretBox;
use service::{
    command,
    domain::{
        user::{self, token},
        User,
    },
    infra::{database, mail, Database, Mailer},
    query, Command as _, Query as _, Service,
};
use tracerr::Traced;

/// In-memory [`Database`] backed by a plain [`Vec`] of [`User`]s.
///
/// With `racy` set, selecting by email always misses, so an [`Insert`] runs
/// into the unique constraint the way a concurrent registration would.
#[derive(Clone, Debug, Default)]
struct InMemoryDb {
    users: Arc<Mutex<Vec<User>>>,
    racy: bool,
}

impl Database<Select<By<Option<User>, user::Id>>> for InMemoryDb {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned())
    }
}

impl<'e> Database<Select<By<Option<User>, &'e user::Email>>> for InMemoryDb {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'e user::Email>>,
    ) -> Result<Self::Ok, Self::Err> {
        if self.racy {
            return Ok(None);
        }
        let email = by.into_inner();
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| &u.email == email)
            .cloned())
    }
}

impl Database<Insert<User>> for InMemoryDb {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(tracerr::new!(database::Error::UniqueViolation(
                Some("users_email_key".to_owned())
            )));
        }
        users.push(user);
        Ok(())
    }
}

impl Database<Update<User>> for InMemoryDb {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(user): Update<User>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut users = self.users.lock().unwrap();
        let stored = users
            .iter_mut()
            .find(|u| u.id == user.id)
            .expect("updated `User` exists");
        *stored = user;
        Ok(())
    }
}

/// [`Mailer`] recording every delivered [`mail::Message`].
#[derive(Clone, Debug, Default)]
struct RecordingMailer {
    sent: Arc<Mutex<Vec<mail::Message>>>,
}

impl Mailer<Deliver<mail::Message>> for RecordingMailer {
    type Ok = ();
    type Err = Traced<mail::Error>;

    async fn execute(
        &self,
        Deliver(message): Deliver<mail::Message>,
    ) -> Result<Self::Ok, Self::Err> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

const JWT_SECRET: &[u8] = b"test-secret";
const PUBLIC_URL: &str = "http://test.local";

fn config() -> service::Config {
    service::Config {
        jwt_encoding_key: jsonwebtoken::EncodingKey::from_secret(JWT_SECRET),
        jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(JWT_SECRET),
        action_token_ttl: Duration::from_secs(3600),
        public_url: PUBLIC_URL.to_owned(),
    }
}

fn service() -> Service<InMemoryDb, RecordingMailer> {
    Service::new(config(), InMemoryDb::default(), RecordingMailer::default())
}

fn email(address: &str) -> user::Email {
    address.parse().expect("valid email")
}

fn password(raw: &str) -> SecretBox<user::Password> {
    let password = raw.parse::<user::Password>().expect("valid password");
    SecretBox::new(Box::new(password))
}

/// Extracts the token from the link terminating a [`mail::Message`] body.
fn token_of(message: &mail::Message) -> String {
    message
        .body
        .rsplit('/')
        .next()
        .expect("link in the body")
        .to_owned()
}

/// Signs an action token with the provided claims.
fn sign(claims: &token::Claims) -> token::Token {
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        claims,
        &jsonwebtoken::EncodingKey::from_secret(JWT_SECRET),
    )
    .expect("claims are encodable")
    .parse()
    .expect("infallible")
}

async fn register(
    service: &Service<InMemoryDb, RecordingMailer>,
    address: &str,
) -> User {
    service
        .execute(command::CreateUser {
            email: email(address),
            password: password("password123"),
        })
        .await
        .expect("registration succeeds")
}

mod create_user {
    use common::Handler as _;

    use super::{
        command::{self, create_user::ExecutionError as E},
        email, password, register, service, token_of, InMemoryDb, Service,
        PUBLIC_URL,
    };

    #[tokio::test]
    async fn creates_unverified_user() {
        let service = service();

        let user = register(&service, "alice@example.com").await;

        assert_eq!(user.email, email("alice@example.com"));
        assert!(!user.is_verified);
        assert!(user.password_hash.verify(
            &"password123".parse().unwrap(),
        ));
    }

    #[tokio::test]
    async fn sends_confirmation_email() {
        let service = service();

        _ = register(&service, "alice@example.com").await;

        let sent = service.mailer().sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, email("alice@example.com"));
        assert_eq!(sent[0].subject, "Email Verification");
        assert!(sent[0].body.starts_with(
            "Please click the link to verify your email: ",
        ));
        assert!(sent[0].body.contains(&format!("{PUBLIC_URL}/confirm/")));
        assert!(!token_of(&sent[0]).is_empty());
    }

    #[tokio::test]
    async fn rejects_occupied_email() {
        let service = service();
        _ = register(&service, "alice@example.com").await;

        let err = service
            .execute(command::CreateUser {
                email: email("alice@example.com"),
                password: password("another-password"),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::EmailOccupied(_)));
    }

    #[tokio::test]
    async fn rejects_email_occupied_concurrently() {
        let service = service();
        _ = register(&service, "alice@example.com").await;

        let racy = Service::new(
            super::config(),
            InMemoryDb {
                users: service.database().users.clone(),
                racy: true,
            },
            super::RecordingMailer::default(),
        );
        let err = racy
            .execute(command::CreateUser {
                email: email("alice@example.com"),
                password: password("another-password"),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::EmailOccupied(_)));
    }
}

mod confirm_user_email {
    use std::time::Duration;

    use common::Handler as _;

    use service::domain::user::token;

    use super::{
        command::{self, confirm_user_email::ExecutionError as E},
        email, register, service, sign, token_of,
    };

    #[tokio::test]
    async fn marks_user_verified() {
        let service = service();
        _ = register(&service, "alice@example.com").await;
        let token = token_of(&service.mailer().sent.lock().unwrap()[0]);

        let user = service
            .execute(command::ConfirmUserEmail {
                token: token.parse().unwrap(),
            })
            .await
            .unwrap();

        assert!(user.is_verified);
        assert!(service.database().users.lock().unwrap()[0].is_verified);
    }

    #[tokio::test]
    async fn is_idempotent() {
        let service = service();
        _ = register(&service, "alice@example.com").await;
        let token = token_of(&service.mailer().sent.lock().unwrap()[0]);

        for _ in 0..2 {
            let user = service
                .execute(command::ConfirmUserEmail {
                    token: token.parse().unwrap(),
                })
                .await
                .unwrap();
            assert!(user.is_verified);
        }
    }

    #[tokio::test]
    async fn rejects_garbage_token() {
        let service = service();

        let err = service
            .execute(command::ConfirmUserEmail {
                token: "not-a-jwt".parse().unwrap(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::InvalidToken(_)));
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        let service = service();
        _ = register(&service, "alice@example.com").await;

        let token = sign(&token::Claims {
            email: email("alice@example.com"),
            purpose: token::Purpose::EmailConfirm,
            expires_at: token::ExpirationDateTime::now()
                - Duration::from_secs(3601),
        });
        let err = service
            .execute(command::ConfirmUserEmail { token })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::TokenExpired));
    }

    #[tokio::test]
    async fn rejects_password_reset_token() {
        let service = service();
        _ = register(&service, "alice@example.com").await;

        let token = sign(&token::Claims::new(
            email("alice@example.com"),
            token::Purpose::PasswordReset,
            Duration::from_secs(3600),
        ));
        let err = service
            .execute(command::ConfirmUserEmail { token })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            E::WrongPurpose(token::Purpose::PasswordReset),
        ));
    }

    #[tokio::test]
    async fn rejects_token_of_unknown_user() {
        let service = service();

        let token = sign(&token::Claims::new(
            email("ghost@example.com"),
            token::Purpose::EmailConfirm,
            Duration::from_secs(3600),
        ));
        let err = service
            .execute(command::ConfirmUserEmail { token })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::UserNotExists(_)));
    }
}

mod create_user_session {
    use common::Handler as _;

    use super::{
        command::{self, create_user_session::ExecutionError as E},
        email, password, register, service, token_of,
    };

    async fn register_verified(
        service: &super::Service<super::InMemoryDb, super::RecordingMailer>,
        address: &str,
    ) {
        _ = register(service, address).await;
        let token = token_of(&service.mailer().sent.lock().unwrap()[0]);
        _ = service
            .execute(command::ConfirmUserEmail {
                token: token.parse().unwrap(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn issues_token_for_verified_user() {
        let service = service();
        register_verified(&service, "alice@example.com").await;

        let out = service
            .execute(command::CreateUserSession {
                email: email("alice@example.com"),
                password: password("password123"),
            })
            .await
            .unwrap();

        assert_eq!(out.user.email, email("alice@example.com"));
        assert!(
            out.expires_at
                > service::domain::user::session::ExpirationDateTime::now(),
        );

        let session = service
            .execute(command::AuthorizeUserSession { token: out.token })
            .await
            .unwrap();
        assert_eq!(session.user_id, out.user.id);
    }

    #[tokio::test]
    async fn rejects_wrong_password() {
        let service = service();
        register_verified(&service, "alice@example.com").await;

        let err = service
            .execute(command::CreateUserSession {
                email: email("alice@example.com"),
                password: password("wrong-password"),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::WrongCredentials));
    }

    #[tokio::test]
    async fn rejects_unknown_email() {
        let service = service();

        let err = service
            .execute(command::CreateUserSession {
                email: email("ghost@example.com"),
                password: password("password123"),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::WrongCredentials));
    }

    #[tokio::test]
    async fn rejects_unconfirmed_email() {
        let service = service();
        _ = register(&service, "alice@example.com").await;

        let err = service
            .execute(command::CreateUserSession {
                email: email("alice@example.com"),
                password: password("password123"),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::EmailNotConfirmed));
    }
}

mod password_reset {
    use common::Handler as _;

    use super::{
        command::{
            self, request_password_reset::ExecutionError as RequestError,
        },
        email, password, register, service, token_of, PUBLIC_URL,
    };

    #[tokio::test]
    async fn sends_reset_email() {
        let service = service();
        _ = register(&service, "alice@example.com").await;

        service
            .execute(command::RequestPasswordReset {
                email: email("alice@example.com"),
            })
            .await
            .unwrap();

        let sent = service.mailer().sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].subject, "Password Reset Request");
        assert!(sent[1].body.starts_with(
            "Please click the link to reset your password: ",
        ));
        assert!(sent[1].body.contains(&format!("{PUBLIC_URL}/reset/")));
    }

    #[tokio::test]
    async fn rejects_unknown_email() {
        let service = service();

        let err = service
            .execute(command::RequestPasswordReset {
                email: email("ghost@example.com"),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), RequestError::UserNotExists(_)));
    }

    #[tokio::test]
    async fn replaces_password() {
        let service = service();
        _ = register(&service, "alice@example.com").await;
        service
            .execute(command::RequestPasswordReset {
                email: email("alice@example.com"),
            })
            .await
            .unwrap();
        let token = token_of(&service.mailer().sent.lock().unwrap()[1]);

        let user = service
            .execute(command::ResetUserPassword {
                token: token.parse().unwrap(),
                new_password: password("new-password-42"),
            })
            .await
            .unwrap();

        assert!(user.password_hash.verify(
            &"new-password-42".parse().unwrap(),
        ));
        assert!(!user.password_hash.verify(
            &"password123".parse().unwrap(),
        ));
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        use std::time::Duration;

        use command::reset_user_password::ExecutionError as E;
        use service::domain::user::token;

        let service = service();
        _ = register(&service, "alice@example.com").await;

        let token = super::sign(&token::Claims {
            email: email("alice@example.com"),
            purpose: token::Purpose::PasswordReset,
            expires_at: token::ExpirationDateTime::now()
                - Duration::from_secs(3601),
        });
        let err = service
            .execute(command::ResetUserPassword {
                token,
                new_password: password("new-password-42"),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::TokenExpired));
    }

    #[tokio::test]
    async fn rejects_confirmation_token() {
        use command::reset_user_password::ExecutionError as E;

        let service = service();
        _ = register(&service, "alice@example.com").await;
        let token = token_of(&service.mailer().sent.lock().unwrap()[0]);

        let err = service
            .execute(command::ResetUserPassword {
                token: token.parse().unwrap(),
                new_password: password("new-password-42"),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::WrongPurpose(_)));
    }
}

mod queries {
    use common::Handler as _;

    use super::{query, register, service};

    #[tokio::test]
    async fn selects_user_by_id() {
        let service = service();
        let user = register(&service, "alice@example.com").await;

        let found = service
            .execute(query::user::ById::by(user.id))
            .await
            .unwrap();

        assert_eq!(found.map(|u| u.id), Some(user.id));
    }

    #[tokio::test]
    async fn misses_unknown_id() {
        let service = service();

        let found = service
            .execute(query::user::ById::by(
                service::domain::user::Id::new(),
            ))
            .await
            .unwrap();

        assert!(found.is_none());
    }
}
