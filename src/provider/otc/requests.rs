//! Request bodies for the OTC IAM and WAF APIs

use crate::provider::ServerEndpoint;
use serde::Serialize;

/// `POST /v1/{project_id}/waf/certificate`
#[derive(Serialize)]
pub(crate) struct CreateCertificateRequest<'a> {
    pub name: &'a str,
    pub content: &'a str,
    pub key: &'a str,
}

/// `PATCH /v1/{project_id}/waf/instance/{instance_id}`
#[derive(Debug, Serialize)]
pub(crate) struct UpdateDomainRequest<'a> {
    pub certificate_id: &'a str,
    pub server: &'a [ServerEndpoint],
}

/// `POST /v3/auth/tokens` with password identity scoped to a project
#[derive(Serialize)]
pub(crate) struct TokenRequest<'a> {
    pub auth: TokenAuth<'a>,
}

#[derive(Serialize)]
pub(crate) struct TokenAuth<'a> {
    pub identity: Identity<'a>,
    pub scope: Scope<'a>,
}

#[derive(Serialize)]
pub(crate) struct Identity<'a> {
    pub methods: [&'static str; 1],
    pub password: PasswordIdentity<'a>,
}

#[derive(Serialize)]
pub(crate) struct PasswordIdentity<'a> {
    pub user: User<'a>,
}

#[derive(Serialize)]
pub(crate) struct User<'a> {
    pub name: &'a str,
    pub password: &'a str,
    pub domain: Named<'a>,
}

#[derive(Serialize)]
pub(crate) struct Scope<'a> {
    pub project: Named<'a>,
}

#[derive(Serialize)]
pub(crate) struct Named<'a> {
    pub name: &'a str,
}

impl<'a> TokenRequest<'a> {
    pub fn password(
        username: &'a str,
        password: &'a str,
        domain_name: &'a str,
        project_name: &'a str,
    ) -> Self {
        Self {
            auth: TokenAuth {
                identity: Identity {
                    methods: ["password"],
                    password: PasswordIdentity {
                        user: User {
                            name: username,
                            password,
                            domain: Named { name: domain_name },
                        },
                    },
                },
                scope: Scope {
                    project: Named { name: project_name },
                },
            },
        }
    }
}
