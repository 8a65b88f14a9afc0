use crate::config::{ProvisioningConfig, ProxyMode, LETSENCRYPT_LIVE};

/// Render the nginx virtual host for the selected proxy variant.
pub fn render(cfg: &ProvisioningConfig) -> String {
    let mut out = upstreams(cfg);
    match &cfg.proxy {
        ProxyMode::HttpOnly { .. } => {
            let listen = "listen 80 default_server;\n    listen [::]:80 default_server;";
            out.push_str(&server_block(cfg, listen, "_", ""));
        }
        ProxyMode::Https { domain, .. } => {
            out.push_str(&format!(
                "server {{
    listen 80;
    listen [::]:80;
    server_name {domain};
    return 301 https://$host$request_uri;
}}

"
            ));
            let tls = format!(
                "
    ssl_certificate {live}/{domain}/fullchain.pem;
    ssl_certificate_key {live}/{domain}/privkey.pem;
    ssl_session_timeout 30m;
    ssl_protocols TLSv1.2 TLSv1.3;
    ssl_prefer_server_ciphers off;
",
                live = LETSENCRYPT_LIVE,
            );
            let listen = "listen 443 ssl http2;\n    listen [::]:443 ssl http2;";
            out.push_str(&server_block(cfg, listen, domain, &tls));
        }
    }
    out
}

fn upstreams(cfg: &ProvisioningConfig) -> String {
    let layout = &cfg.layout;
    format!(
        "upstream {svc} {{
    server 127.0.0.1:{http};
}}

upstream {svc}chat {{
    server 127.0.0.1:{rt};
}}

map $http_upgrade $connection_upgrade {{
    default upgrade;
    ''      close;
}}

",
        svc = layout.service_name,
        http = layout.http_port,
        rt = layout.realtime_port,
    )
}

fn server_block(cfg: &ProvisioningConfig, listen: &str, server_name: &str, tls: &str) -> String {
    let layout = &cfg.layout;
    let [access_log, error_log] = layout.proxy_logs();
    format!(
        "server {{
    {listen}
    server_name {server_name};
{tls}
    proxy_read_timeout 720s;
    proxy_connect_timeout 720s;
    proxy_send_timeout 720s;
    client_max_body_size 100m;

    access_log {access};
    error_log {error};

    location /websocket {{
        proxy_pass http://{svc}chat;
        proxy_set_header Upgrade $http_upgrade;
        proxy_set_header Connection $connection_upgrade;
        proxy_set_header X-Forwarded-Host $host;
        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;
        proxy_set_header X-Forwarded-Proto $scheme;
        proxy_set_header X-Real-IP $remote_addr;
    }}

    location / {{
        proxy_set_header X-Forwarded-Host $host;
        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;
        proxy_set_header X-Forwarded-Proto $scheme;
        proxy_set_header X-Real-IP $remote_addr;
        proxy_redirect off;
        proxy_pass http://{svc};
    }}

    location ~* /web/static/ {{
        proxy_cache_valid 200 90m;
        proxy_buffering on;
        expires 864000;
        proxy_pass http://{svc};
    }}

    gzip on;
    gzip_types text/css text/scss text/plain text/xml application/xml application/json application/javascript;
}}
",
        access = access_log.display(),
        error = error_log.display(),
        svc = layout.service_name,
    )
}
