diesel::table! {
    users (id) {
        id -> Int4,
        username -> Text,
        password -> Text,
        full_name -> Text,
        email -> Text,
        role -> Text,
        active -> Bool,
        status -> Nullable<Text>,
        status_message -> Nullable<Text>,
        permissions -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    companies (id) {
        id -> Int4,
        name -> Text,
        logo -> Nullable<Text>,
        tax_id -> Nullable<Text>,
        address -> Nullable<Text>,
        phone -> Nullable<Text>,
        email -> Nullable<Text>,
        website -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    system_audit_logs (id) {
        id -> Int4,
        user_id -> Nullable<Int4>,
        action -> Text,
        entity_type -> Text,
        entity_id -> Nullable<Int4>,
        details -> Nullable<Jsonb>,
        ip_address -> Nullable<Text>,
        user_agent -> Nullable<Text>,
        module -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    system_alerts (id) {
        id -> Int4,
        message -> Text,
        priority -> Text,
        status -> Text,
        module -> Text,
        reference_type -> Nullable<Text>,
        reference_id -> Nullable<Int4>,
        created_by -> Nullable<Int4>,
        acknowledged_at -> Nullable<Timestamptz>,
        acknowledged_by -> Nullable<Int4>,
        resolved_at -> Nullable<Timestamptz>,
        resolved_by -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    employees (id) {
        id -> Int4,
        name -> Text,
        cpf -> Nullable<Text>,
        rg -> Nullable<Text>,
        birth_date -> Nullable<Date>,
        gender -> Nullable<Text>,
        marital_status -> Nullable<Text>,
        address -> Nullable<Text>,
        city -> Nullable<Text>,
        state -> Nullable<Text>,
        postal_code -> Nullable<Text>,
        email -> Nullable<Text>,
        phone -> Nullable<Text>,
        cellphone -> Nullable<Text>,
        position -> Text,
        department -> Text,
        hiring_date -> Date,
        salary -> Nullable<Float8>,
        status -> Text,
        termination_date -> Nullable<Date>,
        notes -> Nullable<Text>,
        user_id -> Nullable<Int4>,
        created_by -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    departments (id) {
        id -> Int4,
        name -> Text,
        description -> Nullable<Text>,
        manager_id -> Nullable<Int4>,
        parent_department_id -> Nullable<Int4>,
        budget -> Nullable<Float8>,
        created_by -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    positions (id) {
        id -> Int4,
        name -> Text,
        description -> Nullable<Text>,
        department_id -> Nullable<Int4>,
        responsibilities -> Nullable<Text>,
        requirements -> Nullable<Text>,
        salary_range_min -> Nullable<Float8>,
        salary_range_max -> Nullable<Float8>,
        created_by -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    leaves (id) {
        id -> Int4,
        employee_id -> Int4,
        #[sql_name = "type"]
        type_ -> Text,
        start_date -> Date,
        end_date -> Date,
        status -> Text,
        reason -> Nullable<Text>,
        notes -> Nullable<Text>,
        approved_by_id -> Nullable<Int4>,
        approved_date -> Nullable<Timestamptz>,
        created_by -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    payroll (id) {
        id -> Int4,
        employee_id -> Int4,
        year -> Int4,
        month -> Int4,
        base_salary -> Float8,
        gross_salary -> Float8,
        net_salary -> Float8,
        inss -> Nullable<Float8>,
        irrf -> Nullable<Float8>,
        fgts -> Nullable<Float8>,
        benefits -> Float8,
        deductions -> Float8,
        bonuses -> Float8,
        payment_date -> Nullable<Date>,
        status -> Text,
        notes -> Nullable<Text>,
        created_by -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    suppliers (id) {
        id -> Int4,
        name -> Text,
        tax_id -> Nullable<Text>,
        contact_name -> Nullable<Text>,
        email -> Nullable<Text>,
        phone -> Nullable<Text>,
        address -> Nullable<Text>,
        created_by -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    raw_materials (id) {
        id -> Int4,
        name -> Text,
        code -> Text,
        unit -> Text,
        current_stock -> Float8,
        minimum_stock -> Float8,
        price -> Float8,
        location_in_warehouse -> Nullable<Text>,
        created_by -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    measurement_units (id) {
        id -> Int4,
        name -> Text,
        symbol -> Text,
        #[sql_name = "type"]
        type_ -> Text,
        base_unit -> Bool,
        conversion_factor -> Float8,
        created_by -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    products (id) {
        id -> Int4,
        name -> Text,
        code -> Text,
        description -> Nullable<Text>,
        ncm -> Nullable<Text>,
        unit -> Text,
        unit_cost -> Float8,
        selling_price -> Nullable<Float8>,
        created_by -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    product_formulas (id) {
        id -> Int4,
        product_id -> Int4,
        material_id -> Int4,
        quantity -> Float8,
        unit -> Nullable<Text>,
        description -> Nullable<Text>,
        created_by -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    product_pricing (id) {
        id -> Int4,
        product_id -> Int4,
        raw_material_cost -> Float8,
        labor_cost -> Float8,
        overhead_cost -> Float8,
        freight_cost -> Float8,
        taxes -> Float8,
        profit_margin -> Float8,
        total_cost -> Float8,
        suggested_price -> Float8,
        margin -> Float8,
        calculation_date -> Date,
        created_by -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    quotations (id) {
        id -> Int4,
        quotation_number -> Text,
        status -> Text,
        creation_date -> Date,
        closing_date -> Nullable<Date>,
        notes -> Nullable<Text>,
        created_by -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    quotation_items (id) {
        id -> Int4,
        quotation_id -> Int4,
        material_id -> Int4,
        quantity -> Float8,
        unit_id -> Nullable<Int4>,
        unit_measurement -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    supplier_quotations (id) {
        id -> Int4,
        quotation_item_id -> Int4,
        supplier_id -> Int4,
        unit_price -> Float8,
        freight -> Float8,
        taxes -> Float8,
        total_price -> Float8,
        delivery_time -> Nullable<Int4>,
        payment_terms -> Nullable<Text>,
        notes -> Nullable<Text>,
        is_selected -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    fiscal_certificates (id) {
        id -> Int4,
        name -> Text,
        serial_number -> Text,
        valid_from -> Date,
        valid_to -> Date,
        certificate_data -> Text,
        password -> Text,
        is_active -> Bool,
        created_by -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    fiscal_ncms (id) {
        id -> Int4,
        code -> Text,
        description -> Text,
        aliquota_nacional -> Nullable<Float8>,
        aliquota_importado -> Nullable<Float8>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    fiscal_cfops (id) {
        id -> Int4,
        code -> Text,
        description -> Text,
        tipo -> Text,
        operacao -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    fiscal_csts (id) {
        id -> Int4,
        code -> Text,
        description -> Text,
        tipo -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    fiscal_configs (id) {
        id -> Int4,
        ambiente -> Text,
        serie_nfe -> Int4,
        proximo_numero_nfe -> Int4,
        regime_tributario -> Text,
        inscricao_estadual -> Nullable<Text>,
        inscricao_municipal -> Nullable<Text>,
        cnae -> Nullable<Text>,
        certificado_id -> Nullable<Int4>,
        uf_emissor -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    customers (id) {
        id -> Int4,
        name -> Text,
        tax_id -> Nullable<Text>,
        contact_name -> Nullable<Text>,
        email -> Nullable<Text>,
        phone -> Nullable<Text>,
        address -> Nullable<Text>,
        city -> Nullable<Text>,
        uf -> Nullable<Text>,
        postal_code -> Nullable<Text>,
        created_by -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    nfes (id) {
        id -> Int4,
        numero -> Int4,
        serie -> Int4,
        chave -> Text,
        data_emissao -> Timestamptz,
        status -> Text,
        modelo_documento -> Text,
        natureza_operacao -> Text,
        tipo_operacao -> Text,
        finalidade -> Text,
        destinatario_id -> Int4,
        valor_total -> Float8,
        valor_produtos -> Float8,
        valor_frete -> Float8,
        valor_seguro -> Float8,
        valor_desconto -> Float8,
        valor_outras_despesas -> Float8,
        valor_icms -> Float8,
        valor_icms_st -> Float8,
        valor_ipi -> Float8,
        valor_pis -> Float8,
        valor_cofins -> Float8,
        informacoes_adicionais -> Nullable<Text>,
        protocolo -> Nullable<Text>,
        xml_envio -> Nullable<Text>,
        xml_retorno -> Nullable<Text>,
        xml_cancelamento -> Nullable<Text>,
        motivo_cancelamento -> Nullable<Text>,
        data_cancelamento -> Nullable<Timestamptz>,
        created_by -> Int4,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    nfe_itens (id) {
        id -> Int4,
        nfe_id -> Int4,
        produto_id -> Int4,
        codigo -> Text,
        descricao -> Text,
        ncm -> Text,
        cfop -> Text,
        unidade -> Text,
        quantidade -> Float8,
        valor_unitario -> Float8,
        valor_total -> Float8,
        valor_desconto -> Float8,
        cst_icms -> Nullable<Text>,
        base_calculo_icms -> Float8,
        aliquota_icms -> Float8,
        valor_icms -> Float8,
        cst_pis -> Nullable<Text>,
        base_calculo_pis -> Float8,
        aliquota_pis -> Float8,
        valor_pis -> Float8,
        cst_cofins -> Nullable<Text>,
        base_calculo_cofins -> Float8,
        aliquota_cofins -> Float8,
        valor_cofins -> Float8,
        cst_ipi -> Nullable<Text>,
        base_calculo_ipi -> Float8,
        aliquota_ipi -> Float8,
        valor_ipi -> Float8,
        informacoes_adicionais -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    nfe_eventos (id) {
        id -> Int4,
        nfe_id -> Int4,
        tipo -> Text,
        status -> Text,
        mensagem -> Nullable<Text>,
        protocolo -> Nullable<Text>,
        xml -> Nullable<Text>,
        data_evento -> Timestamptz,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    quality_inspections (id) {
        id -> Int4,
        inspection_type -> Text,
        reference_type -> Text,
        reference_id -> Int4,
        result -> Text,
        notes -> Nullable<Text>,
        inspection_date -> Date,
        created_by -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    non_conformities (id) {
        id -> Int4,
        code -> Text,
        title -> Text,
        description -> Text,
        status -> Text,
        severity -> Text,
        origin -> Text,
        detected_date -> Date,
        resolved_date -> Nullable<Date>,
        responsible_id -> Nullable<Int4>,
        product_id -> Nullable<Int4>,
        raw_material_id -> Nullable<Int4>,
        process_name -> Nullable<Text>,
        root_cause -> Nullable<Text>,
        correction_plan -> Nullable<Text>,
        preventive_actions -> Nullable<Text>,
        created_by -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    chat_rooms (id) {
        id -> Int4,
        name -> Text,
        description -> Nullable<Text>,
        #[sql_name = "type"]
        type_ -> Text,
        visibility -> Text,
        created_by -> Nullable<Int4>,
        avatar_url -> Nullable<Text>,
        last_message_at -> Nullable<Timestamptz>,
        read_only -> Bool,
        archived -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    chat_room_participants (id) {
        id -> Int4,
        room_id -> Int4,
        user_id -> Int4,
        is_admin -> Bool,
        is_owner -> Bool,
        is_moderator -> Bool,
        last_seen_at -> Nullable<Timestamptz>,
        muted -> Bool,
        notifications -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    chat_messages (id) {
        id -> Int4,
        room_id -> Int4,
        user_id -> Int4,
        content -> Text,
        is_read -> Bool,
        is_system -> Bool,
        parent_id -> Nullable<Int4>,
        attachments -> Jsonb,
        mentions -> Jsonb,
        reactions -> Jsonb,
        edited_at -> Nullable<Timestamptz>,
        edited_by -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    chat_uploads (id) {
        id -> Int4,
        room_id -> Int4,
        user_id -> Int4,
        message_id -> Nullable<Int4>,
        file_name -> Text,
        original_name -> Text,
        mime_type -> Text,
        size -> Int8,
        file_url -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    chat_user_preferences (id) {
        id -> Int4,
        user_id -> Int4,
        theme -> Text,
        message_view_mode -> Text,
        show_avatars -> Bool,
        hide_usernames -> Bool,
        notification_sound -> Bool,
        desktop_notifications -> Text,
        email_notifications -> Text,
        preferences -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    chat_audit_logs (id) {
        id -> Int4,
        user_id -> Nullable<Int4>,
        action -> Text,
        room_id -> Nullable<Int4>,
        message_id -> Nullable<Int4>,
        original_content -> Nullable<Text>,
        new_content -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    support_tickets (id) {
        id -> Int4,
        title -> Text,
        description -> Text,
        status -> Text,
        priority -> Text,
        user_id -> Int4,
        assigned_to -> Nullable<Int4>,
        category -> Text,
        resolution -> Nullable<Text>,
        closed_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    knowledge_articles (id) {
        id -> Int4,
        title -> Text,
        content -> Text,
        category -> Text,
        tags -> Nullable<Text>,
        created_by -> Nullable<Int4>,
        published -> Bool,
        views -> Int4,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    expenses (id) {
        id -> Int4,
        description -> Text,
        amount -> Float8,
        due_date -> Date,
        payment_date -> Nullable<Date>,
        category -> Text,
        is_recurring -> Bool,
        recurrence_info -> Nullable<Jsonb>,
        cost_center -> Nullable<Text>,
        created_by -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    accounts (id) {
        id -> Int4,
        description -> Text,
        amount -> Float8,
        due_date -> Date,
        #[sql_name = "type"]
        type_ -> Text,
        status -> Text,
        entity_name -> Text,
        entity_id -> Nullable<Int4>,
        document_number -> Nullable<Text>,
        created_by -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    production_orders (id) {
        id -> Int4,
        order_number -> Text,
        product_id -> Int4,
        quantity -> Float8,
        status -> Text,
        start_date -> Nullable<Date>,
        end_date -> Nullable<Date>,
        notes -> Nullable<Text>,
        created_by -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    production_losses (id) {
        id -> Int4,
        production_order_id -> Int4,
        quantity -> Float8,
        reason -> Text,
        date -> Date,
        notes -> Nullable<Text>,
        created_by -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    equipment (id) {
        id -> Int4,
        name -> Text,
        model -> Nullable<Text>,
        serial_number -> Nullable<Text>,
        manufacturer -> Nullable<Text>,
        purchase_date -> Nullable<Date>,
        sector -> Text,
        #[sql_name = "type"]
        type_ -> Text,
        criticality -> Text,
        status -> Text,
        created_by -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    maintenance_orders (id) {
        id -> Int4,
        order_number -> Text,
        equipment_id -> Int4,
        #[sql_name = "type"]
        type_ -> Text,
        description -> Text,
        urgency -> Text,
        status -> Text,
        scheduled_date -> Nullable<Date>,
        completion_date -> Nullable<Date>,
        notes -> Nullable<Text>,
        created_by -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    inventory_transactions (id) {
        id -> Int4,
        material_id -> Int4,
        quantity -> Float8,
        transaction_type -> Text,
        reference_type -> Nullable<Text>,
        reference_id -> Nullable<Int4>,
        lot_number -> Nullable<Text>,
        expiration_date -> Nullable<Date>,
        notes -> Nullable<Text>,
        created_by -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    orders (id) {
        id -> Int4,
        order_number -> Text,
        customer_id -> Int4,
        order_date -> Date,
        delivery_date -> Nullable<Date>,
        status -> Text,
        total_amount -> Float8,
        notes -> Nullable<Text>,
        created_by -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    order_items (id) {
        id -> Int4,
        order_id -> Int4,
        product_id -> Int4,
        quantity -> Float8,
        unit_price -> Float8,
        total_price -> Float8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    produtos_fiscais (id) {
        id -> Int4,
        produto_id -> Int4,
        ncm -> Text,
        cfop_padrao -> Nullable<Text>,
        cst_icms -> Nullable<Text>,
        aliquota_icms -> Nullable<Float8>,
        cst_pis -> Nullable<Text>,
        aliquota_pis -> Nullable<Float8>,
        cst_cofins -> Nullable<Text>,
        aliquota_cofins -> Nullable<Float8>,
        cst_ipi -> Nullable<Text>,
        aliquota_ipi -> Nullable<Float8>,
        codigo_barras -> Nullable<Text>,
        codigo_anp -> Nullable<Text>,
        updated_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(chat_audit_logs -> chat_rooms (room_id));
diesel::joinable!(chat_audit_logs -> users (user_id));
diesel::joinable!(chat_messages -> chat_rooms (room_id));
diesel::joinable!(chat_room_participants -> chat_rooms (room_id));
diesel::joinable!(chat_room_participants -> users (user_id));
diesel::joinable!(chat_rooms -> users (created_by));
diesel::joinable!(chat_uploads -> chat_messages (message_id));
diesel::joinable!(chat_uploads -> chat_rooms (room_id));
diesel::joinable!(chat_uploads -> users (user_id));
diesel::joinable!(chat_user_preferences -> users (user_id));
diesel::joinable!(customers -> users (created_by));
diesel::joinable!(departments -> employees (manager_id));
diesel::joinable!(departments -> users (created_by));
diesel::joinable!(fiscal_certificates -> users (created_by));
diesel::joinable!(fiscal_configs -> fiscal_certificates (certificado_id));
diesel::joinable!(knowledge_articles -> users (created_by));
diesel::joinable!(leaves -> employees (employee_id));
diesel::joinable!(measurement_units -> users (created_by));
diesel::joinable!(nfe_eventos -> nfes (nfe_id));
diesel::joinable!(nfe_itens -> nfes (nfe_id));
diesel::joinable!(nfe_itens -> products (produto_id));
diesel::joinable!(nfes -> customers (destinatario_id));
diesel::joinable!(nfes -> users (created_by));
diesel::joinable!(non_conformities -> products (product_id));
diesel::joinable!(non_conformities -> raw_materials (raw_material_id));
diesel::joinable!(payroll -> employees (employee_id));
diesel::joinable!(payroll -> users (created_by));
diesel::joinable!(positions -> departments (department_id));
diesel::joinable!(positions -> users (created_by));
diesel::joinable!(product_formulas -> products (product_id));
diesel::joinable!(product_formulas -> raw_materials (material_id));
diesel::joinable!(product_formulas -> users (created_by));
diesel::joinable!(product_pricing -> products (product_id));
diesel::joinable!(product_pricing -> users (created_by));
diesel::joinable!(products -> users (created_by));
diesel::joinable!(quality_inspections -> users (created_by));
diesel::joinable!(quotation_items -> measurement_units (unit_id));
diesel::joinable!(quotation_items -> quotations (quotation_id));
diesel::joinable!(quotation_items -> raw_materials (material_id));
diesel::joinable!(quotations -> users (created_by));
diesel::joinable!(raw_materials -> users (created_by));
diesel::joinable!(supplier_quotations -> quotation_items (quotation_item_id));
diesel::joinable!(supplier_quotations -> suppliers (supplier_id));
diesel::joinable!(suppliers -> users (created_by));
diesel::joinable!(system_audit_logs -> users (user_id));
diesel::joinable!(production_orders -> products (product_id));
diesel::joinable!(production_losses -> production_orders (production_order_id));
diesel::joinable!(maintenance_orders -> equipment (equipment_id));
diesel::joinable!(inventory_transactions -> raw_materials (material_id));
diesel::joinable!(orders -> customers (customer_id));
diesel::joinable!(order_items -> orders (order_id));
diesel::joinable!(order_items -> products (product_id));
diesel::joinable!(produtos_fiscais -> products (produto_id));

diesel::allow_tables_to_appear_in_same_query!(
    accounts,
    chat_audit_logs,
    chat_messages,
    chat_room_participants,
    chat_rooms,
    chat_uploads,
    chat_user_preferences,
    companies,
    customers,
    departments,
    employees,
    equipment,
    expenses,
    fiscal_certificates,
    fiscal_cfops,
    fiscal_configs,
    fiscal_csts,
    fiscal_ncms,
    inventory_transactions,
    knowledge_articles,
    leaves,
    maintenance_orders,
    measurement_units,
    nfe_eventos,
    nfe_itens,
    nfes,
    non_conformities,
    order_items,
    orders,
    payroll,
    positions,
    product_formulas,
    product_pricing,
    production_losses,
    production_orders,
    products,
    produtos_fiscais,
    quality_inspections,
    quotation_items,
    quotations,
    raw_materials,
    supplier_quotations,
    suppliers,
    support_tickets,
    system_alerts,
    system_audit_logs,
    users,
);
